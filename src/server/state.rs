//! Application state shared across all request handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::chat::{ChatConfig, ChatSession, ReqwestTransport, ResponseResolver, SessionId};

/// Default directory for the site's static assets.
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Sessions untouched for this long are dropped by the sweeper.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);

struct SessionSlot {
    session: Arc<Mutex<ChatSession>>,
    last_active: Instant,
}

/// Shared application state.
pub struct AppState {
    /// Resolver shared by every session.
    pub resolver: Arc<ResponseResolver>,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
    /// Idle time after which a session is evicted.
    pub session_idle: Duration,
    sessions: DashMap<SessionId, SessionSlot>,
}

impl AppState {
    /// Create state from `CHIZEL_*` environment variables.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built.
    pub fn from_env() -> Result<Arc<Self>, Box<dyn std::error::Error + Send + Sync>> {
        let config = ChatConfig::from_env();
        let transport = ReqwestTransport::new()?;
        let resolver = ResponseResolver::new(config, Arc::new(transport))?;

        let static_dir =
            std::env::var("CHIZEL_STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string());
        let session_idle = std::env::var("CHIZEL_SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .map_or(DEFAULT_SESSION_IDLE, Duration::from_secs);

        Ok(Self::new(resolver, static_dir, session_idle))
    }

    /// Create state around an existing resolver.
    #[must_use]
    pub fn new(
        resolver: ResponseResolver,
        static_dir: impl AsRef<Path>,
        session_idle: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            resolver: Arc::new(resolver),
            static_dir: static_dir.as_ref().to_path_buf(),
            session_idle,
            sessions: DashMap::new(),
        })
    }

    /// Get the session with this id, creating it if needed, and mark it active.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Arc<Mutex<ChatSession>> {
        let mut slot = self.sessions.entry(id).or_insert_with(|| SessionSlot {
            session: Arc::new(Mutex::new(ChatSession::with_id(id, self.resolver.clone()))),
            last_active: Instant::now(),
        });
        slot.last_active = Instant::now();
        slot.session.clone()
    }

    /// Get an existing session.
    #[must_use]
    pub fn existing_session(&self, id: SessionId) -> Option<Arc<Mutex<ChatSession>>> {
        self.sessions.get(&id).map(|slot| slot.session.clone())
    }

    /// Forget a session (its panel was closed). Returns whether it existed.
    ///
    /// A resolution still in flight finishes on its own handle.
    pub fn close_session(&self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Drop sessions idle for longer than `session_idle`. Returns how many went.
    ///
    /// Sessions referenced elsewhere (a request or resolution in progress)
    /// are kept regardless of age.
    pub fn evict_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, slot| {
            Arc::strong_count(&slot.session) > 1 || slot.last_active.elapsed() < self.session_idle
        });
        before.saturating_sub(self.sessions.len())
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
