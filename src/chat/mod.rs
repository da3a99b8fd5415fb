//! Chat widget core for the Chizel site.
//!
//! This module provides:
//! - Reply resolution with ordered provider fallback (OpenAI-compatible, Gemini, local rules)
//! - Deadline-bound, cancellable HTTP transport
//! - Append-only conversation log with a bounded upstream history view
//! - Session flow, optional speech capability, and telemetry sink

pub mod config;
pub mod error;
pub mod ids;
pub mod matcher;
pub mod message;
pub mod providers;
pub mod resolver;
pub mod session;
pub mod speech;
pub mod store;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ChatConfig;
pub use error::{ChatError, ChatResult, ProviderError, TransportError};
pub use ids::{MessageId, SessionId};
pub use matcher::{LocalMatcher, LocalReply, MatchCategory, RandomSource, ThreadRngSource};
pub use message::{HistoryEntry, Message, Role};
pub use providers::Provider;
pub use resolver::{Resolution, ResolutionAttempt, ResponseResolver, Strategy, APOLOGY_REPLY};
pub use session::ChatSession;
pub use speech::{speakable_text, NoSpeech, SpeechCapability};
pub use store::{ConversationStore, API_HISTORY_WINDOW};
pub use telemetry::{TelemetrySink, TracingTelemetry};
pub use transport::{
    call_with_deadline, CallCanceller, DeadlineCall, HttpRequest, HttpResponse, ReqwestTransport,
    Transport,
};
