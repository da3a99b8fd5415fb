//! Upstream language-model providers.

pub mod gemini;
pub mod openai;

use serde::{Deserialize, Serialize};

use crate::chat::config::ChatConfig;
use crate::chat::error::{ChatResult, ProviderError};
use crate::chat::message::HistoryEntry;
use crate::chat::transport::HttpRequest;

/// Available providers, in fallback order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// OpenAI-compatible chat completions (primary).
    OpenAi,
    /// Google Gemini (secondary).
    Gemini,
}

impl Provider {
    /// Order in which providers are attempted.
    pub const FALLBACK_ORDER: [Self; 2] = [Self::OpenAi, Self::Gemini];

    /// Short name used in logs and telemetry labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Usable credential for this provider, if configured.
    #[must_use]
    pub fn api_key(self, config: &ChatConfig) -> Option<&str> {
        match self {
            Self::OpenAi => config.primary_key(),
            Self::Gemini => config.secondary_key(),
        }
    }

    /// Build the provider-specific request.
    ///
    /// # Errors
    /// Returns an error if the request cannot be constructed.
    pub fn build_request(
        self,
        config: &ChatConfig,
        api_key: &str,
        history: &[HistoryEntry],
        user_message: &str,
    ) -> ChatResult<HttpRequest> {
        match self {
            Self::OpenAi => openai::build_request(config, api_key, history, user_message),
            Self::Gemini => gemini::build_request(config, api_key, history, user_message),
        }
    }

    /// Extract the reply text from a success body.
    ///
    /// # Errors
    /// Returns an error if the body is malformed or carries no text.
    pub fn parse_reply(self, body: &str) -> Result<String, ProviderError> {
        match self {
            Self::OpenAi => openai::parse_reply(body),
            Self::Gemini => gemini::parse_reply(body),
        }
    }
}
