//! HTTP host for the Chizel chat widget.
//!
//! Provides:
//! - `POST /api/chat` to submit a message to a session
//! - `GET /api/chat/{session_id}/history` to read a session log
//! - `DELETE /api/chat/{session_id}` when a panel closes
//! - `GET /health`
//! - The site's static assets for every other path
//!
//! Idle sessions are swept in the background while the server runs.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// How often idle sessions are looked for.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Serve the chat API on `port` until `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the listener cannot be bound or serving fails.
pub async fn serve<F>(
    state: Arc<AppState>,
    port: u16,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        static_dir = %state.static_dir.display(),
        session_idle_secs = state.session_idle.as_secs(),
        "chat server listening"
    );

    let sweeper = tokio::spawn(sweep_idle_sessions(state.clone()));
    let served = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal)
        .await;
    sweeper.abort();
    served?;

    Ok(())
}

async fn sweep_idle_sessions(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let evicted = state.evict_idle();
        if evicted > 0 {
            debug!(evicted, open = state.session_count(), "evicted idle sessions");
        }
    }
}
