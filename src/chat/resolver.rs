//! Reply resolution with ordered provider fallback.
//!
//! For each user message the resolver tries the primary provider, then the
//! secondary provider, then the [`LocalMatcher`]. Unconfigured providers are
//! skipped; each attempted provider gets its own deadline; the local matcher
//! always answers. Calls are sequential: at most one upstream request is in
//! flight per resolution.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::chat::config::ChatConfig;
use crate::chat::error::{ChatResult, ProviderError};
use crate::chat::matcher::{LocalMatcher, RandomSource, ThreadRngSource};
use crate::chat::message::HistoryEntry;
use crate::chat::providers::Provider;
use crate::chat::telemetry::{TelemetrySink, TracingTelemetry};
use crate::chat::transport::{call_with_deadline, HttpRequest, Transport};

/// Reply used when the pipeline itself breaks.
pub const APOLOGY_REPLY: &str = "Oops! My thinking cap slipped off for a moment. 🙈 \
Could you ask me that again?";

/// Telemetry event emitted for each provider-answered message.
const RESPONSE_EVENT: &str = "ai_response";
const RESPONSE_CATEGORY: &str = "chat";

/// Which strategy produced (or tried to produce) a reply.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Primary upstream provider.
    Primary,
    /// Secondary upstream provider.
    Secondary,
    /// Offline rule matcher.
    Local,
    /// Fixed reply after an unexpected pipeline failure.
    Apology,
}

impl From<Provider> for Strategy {
    fn from(value: Provider) -> Self {
        match value {
            Provider::OpenAi => Self::Primary,
            Provider::Gemini => Self::Secondary,
        }
    }
}

/// Outcome of one strategy, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolutionAttempt {
    /// Strategy attempted.
    pub strategy: Strategy,
    /// Whether it produced the reply.
    pub success: bool,
    /// Wall time spent.
    pub latency: Duration,
    /// Failure reason.
    pub error: Option<String>,
}

/// Final reply plus the attempts that led to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Reply text, never empty.
    pub reply: String,
    /// Strategy that produced `reply`.
    pub strategy: Strategy,
    /// Attempts in the order they were made. Skipped providers are absent.
    pub attempts: Vec<ResolutionAttempt>,
}

impl Resolution {
    fn apology() -> Self {
        Self {
            reply: APOLOGY_REPLY.to_string(),
            strategy: Strategy::Apology,
            attempts: Vec::new(),
        }
    }
}

/// Produces assistant replies. Stateless per call; never fails.
pub struct ResponseResolver {
    config: ChatConfig,
    transport: Arc<dyn Transport>,
    random: Arc<dyn RandomSource>,
    telemetry: Arc<dyn TelemetrySink>,
    matcher: LocalMatcher,
}

impl ResponseResolver {
    /// Create a resolver with thread-RNG selection and tracing telemetry.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ChatConfig, transport: Arc<dyn Transport>) -> ChatResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            random: Arc::new(ThreadRngSource),
            telemetry: Arc::new(TracingTelemetry),
            matcher: LocalMatcher::new()?,
        })
    }

    /// Replace the random source used by the local matcher.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    /// Replace the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Reply to `user_message` given the prior `history`.
    pub async fn resolve(&self, user_message: &str, history: &[HistoryEntry]) -> String {
        self.resolve_detailed(user_message, history).await.reply
    }

    /// Same as [`ResponseResolver::resolve`], reporting which strategy answered.
    pub async fn resolve_detailed(&self, user_message: &str, history: &[HistoryEntry]) -> Resolution {
        match AssertUnwindSafe(self.run_pipeline(user_message, history))
            .catch_unwind()
            .await
        {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(err)) => {
                error!(error = %err, "reply pipeline failed");
                Resolution::apology()
            }
            Err(_) => {
                error!("reply pipeline panicked");
                Resolution::apology()
            }
        }
    }

    async fn run_pipeline(
        &self,
        user_message: &str,
        history: &[HistoryEntry],
    ) -> ChatResult<Resolution> {
        let window = &history[history.len().saturating_sub(self.config.history_window)..];
        let mut attempts = Vec::new();

        for provider in Provider::FALLBACK_ORDER {
            let strategy = Strategy::from(provider);
            let started = Instant::now();
            let outcome = match provider.api_key(&self.config) {
                Some(api_key) => {
                    let request =
                        provider.build_request(&self.config, api_key, window, user_message)?;
                    self.attempt(provider, request).await
                }
                None => Err(ProviderError::NotConfigured(provider.name())),
            };
            let latency = started.elapsed();

            match outcome {
                Ok(reply) => {
                    info!(
                        provider = provider.name(),
                        latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        "provider replied"
                    );
                    self.telemetry.track(
                        RESPONSE_EVENT,
                        RESPONSE_CATEGORY,
                        provider.name(),
                        Some(latency.as_secs_f64() * 1000.0),
                    );
                    attempts.push(ResolutionAttempt {
                        strategy,
                        success: true,
                        latency,
                        error: None,
                    });
                    return Ok(Resolution {
                        reply,
                        strategy,
                        attempts,
                    });
                }
                Err(err) => {
                    log_failure(provider, &err);
                    if err.is_skip() {
                        continue;
                    }
                    attempts.push(ResolutionAttempt {
                        strategy,
                        success: false,
                        latency,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let local = self.matcher.reply(user_message, self.random.as_ref());
        debug!(category = ?local.category, "answered by local matcher");
        attempts.push(ResolutionAttempt {
            strategy: Strategy::Local,
            success: true,
            latency: Duration::ZERO,
            error: None,
        });

        Ok(Resolution {
            reply: local.text.to_string(),
            strategy: Strategy::Local,
            attempts,
        })
    }

    async fn attempt(&self, provider: Provider, request: HttpRequest) -> Result<String, ProviderError> {
        let response =
            call_with_deadline(self.transport.as_ref(), request, self.config.request_timeout).await?;

        if !response.is_success() {
            return Err(ProviderError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        provider.parse_reply(&response.body)
    }
}

fn log_failure(provider: Provider, err: &ProviderError) {
    let name = provider.name();
    match err {
        ProviderError::NotConfigured(_) => {
            debug!(provider = name, "provider not configured, skipping");
        }
        ProviderError::Timeout(after) => {
            warn!(provider = name, timeout = ?after, "provider timed out, falling back");
        }
        ProviderError::Rejected { status, body } => {
            warn!(provider = name, status, body = %body, "provider rejected request, falling back");
        }
        ProviderError::EmptyReply | ProviderError::Malformed(_) => {
            warn!(provider = name, error = %err, "provider returned unusable payload, falling back");
        }
        ProviderError::Transport(reason) => {
            error!(provider = name, reason = %reason, "provider transport failure, falling back");
        }
    }
}
