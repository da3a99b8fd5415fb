//! Error types for the chat module.

use std::time::Duration;

use thiserror::Error;

use crate::chat::ids::SessionId;

/// Errors surfaced to callers of the chat module.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Submitted text was empty after trimming.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// A resolution is already pending for this session.
    #[error("a reply is still pending for session {0}")]
    SessionBusy(SessionId),

    /// No session with this identifier exists.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Speech capability is not present on this client.
    #[error("speech capability is not available")]
    SpeechUnavailable,

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL building error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Regex compilation error.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Outcome of a single failed transport call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The deadline elapsed before the response settled.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The call was cancelled before it settled.
    #[error("request aborted")]
    Aborted,

    /// DNS, connection, or body read failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Why a provider strategy did not produce a reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credential missing, blank, or a placeholder.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Attempt exceeded its deadline and was aborted.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream answered with a non-success status.
    #[error("upstream rejected request with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body as received.
        body: String,
    },

    /// Upstream answered successfully but without reply text.
    #[error("upstream returned no reply text")]
    EmptyReply,

    /// Upstream body could not be decoded.
    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    /// Connection-level failure.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ProviderError {
    /// True when the strategy was skipped rather than attempted.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

impl From<TransportError> for ProviderError {
    fn from(value: TransportError) -> Self {
        match value {
            TransportError::Timeout(after) => Self::Timeout(after),
            TransportError::Aborted => Self::Transport("aborted".to_string()),
            TransportError::Network(reason) => Self::Transport(reason),
        }
    }
}
