//! Configuration for the chat resolver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::error::{ChatError, ChatResult};
use crate::chat::store::API_HISTORY_WINDOW;

/// Default chat-completions endpoint for the primary provider.
pub const DEFAULT_PRIMARY_URL: &str = "https://api.openai.com/v1/chat/completions";
/// Default model for the primary provider.
pub const DEFAULT_PRIMARY_MODEL: &str = "gpt-4o-mini";
/// Default API root for the secondary provider.
pub const DEFAULT_SECONDARY_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model for the secondary provider.
pub const DEFAULT_SECONDARY_MODEL: &str = "gemini-1.5-flash";
/// Per-attempt deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Persona instruction sent with every upstream request.
pub const DEFAULT_PERSONA_PROMPT: &str = "You are Chizel Buddy, a friendly learning companion \
for children aged 4 to 12 on the Chizel website. Keep answers short (two to four sentences), \
warm, encouraging and age-appropriate. Use simple words and the occasional emoji. Turn \
questions into small discoveries, celebrate curiosity, and never share personal data, \
scary content or anything unsafe for kids. If asked about Chizel, explain that it is a \
playful learning app with games, stories and creative challenges.";

/// Values shipped in sample env files; treated as "not configured".
const PLACEHOLDER_KEYS: &[&str] = &[
    "your-api-key",
    "your-api-key-here",
    "your_api_key",
    "your_api_key_here",
    "your-openai-api-key",
    "your_openai_api_key",
    "your-gemini-api-key",
    "your_gemini_api_key",
    "sk-your-key-here",
    "changeme",
    "placeholder",
    "xxx",
];

/// Settings for the OpenAI-compatible primary provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimaryProviderConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Token budget for the reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for PrimaryProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PRIMARY_URL.to_string(),
            model: DEFAULT_PRIMARY_MODEL.to_string(),
            max_tokens: 300,
            temperature: 0.7,
        }
    }
}

/// Settings for the Gemini secondary provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecondaryProviderConfig {
    /// API root; the model path is appended.
    pub endpoint: String,
    /// Model name.
    pub model: String,
    /// Token budget for the reply.
    pub max_output_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling.
    pub top_p: f32,
}

impl Default for SecondaryProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SECONDARY_URL.to_string(),
            model: DEFAULT_SECONDARY_MODEL.to_string(),
            max_output_tokens: 300,
            temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Configuration injected into the resolver at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Bearer token for the primary provider.
    pub primary_api_key: Option<String>,
    /// Query-string key for the secondary provider.
    pub secondary_api_key: Option<String>,
    /// Primary provider settings.
    pub primary: PrimaryProviderConfig,
    /// Secondary provider settings.
    pub secondary: SecondaryProviderConfig,
    /// Deadline applied to each provider attempt.
    #[serde(with = "duration_ms_serde")]
    pub request_timeout: Duration,
    /// Trailing history entries sent upstream.
    pub history_window: usize,
    /// System/persona instruction.
    pub persona_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            primary_api_key: None,
            secondary_api_key: None,
            primary: PrimaryProviderConfig::default(),
            secondary: SecondaryProviderConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            history_window: API_HISTORY_WINDOW,
            persona_prompt: DEFAULT_PERSONA_PROMPT.to_string(),
        }
    }
}

impl ChatConfig {
    /// Create a config with default settings and no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `CHIZEL_*` environment variables over the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self {
            primary_api_key: env_var("CHIZEL_PRIMARY_API_KEY"),
            secondary_api_key: env_var("CHIZEL_SECONDARY_API_KEY"),
            ..Self::default()
        };
        if let Some(url) = env_var("CHIZEL_PRIMARY_URL") {
            config.primary.endpoint = url;
        }
        if let Some(model) = env_var("CHIZEL_PRIMARY_MODEL") {
            config.primary.model = model;
        }
        if let Some(url) = env_var("CHIZEL_SECONDARY_URL") {
            config.secondary.endpoint = url;
        }
        if let Some(model) = env_var("CHIZEL_SECONDARY_MODEL") {
            config.secondary.model = model;
        }
        if let Some(ms) = env_var("CHIZEL_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.request_timeout = Duration::from_millis(ms);
        }
        config
    }

    /// Set the primary provider key.
    #[must_use]
    pub fn with_primary_api_key(mut self, key: impl Into<String>) -> Self {
        self.primary_api_key = Some(key.into());
        self
    }

    /// Set the secondary provider key.
    #[must_use]
    pub fn with_secondary_api_key(mut self, key: impl Into<String>) -> Self {
        self.secondary_api_key = Some(key.into());
        self
    }

    /// Override the primary endpoint.
    #[must_use]
    pub fn with_primary_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.primary.endpoint = endpoint.into();
        self
    }

    /// Override the secondary API root.
    #[must_use]
    pub fn with_secondary_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.secondary.endpoint = endpoint.into();
        self
    }

    /// Set the per-attempt deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Usable primary key, or `None` if absent or a placeholder.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        configured_key(self.primary_api_key.as_deref())
    }

    /// Usable secondary key, or `None` if absent or a placeholder.
    #[must_use]
    pub fn secondary_key(&self) -> Option<&str> {
        configured_key(self.secondary_api_key.as_deref())
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        if self.history_window == 0 {
            return Err(ChatError::Config("history_window must be > 0".to_string()));
        }

        if self.request_timeout.is_zero() {
            return Err(ChatError::Config("request_timeout must be > 0".to_string()));
        }

        if self.persona_prompt.trim().is_empty() {
            return Err(ChatError::Config("persona_prompt must not be empty".to_string()));
        }

        check_sampling("primary.temperature", self.primary.temperature, 2.0)?;
        check_sampling("secondary.temperature", self.secondary.temperature, 2.0)?;
        check_sampling("secondary.top_p", self.secondary.top_p, 1.0)?;

        Url::parse(&self.primary.endpoint)?;
        Url::parse(&self.secondary.endpoint)?;

        Ok(())
    }
}

/// Non-finite values would serialize as `null` upstream.
fn check_sampling(name: &str, value: f32, max: f32) -> ChatResult<()> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ChatError::Config(format!("{name} must be within 0..={max}")))
    }
}

/// Filter out blank and placeholder credentials.
fn configured_key(key: Option<&str>) -> Option<&str> {
    let key = key?.trim();
    if key.is_empty() {
        return None;
    }
    let lowered = key.to_ascii_lowercase();
    if PLACEHOLDER_KEYS.contains(&lowered.as_str()) || lowered.starts_with("your") {
        return None;
    }
    Some(key)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Serde module for millisecond durations.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
