//! OpenAI-compatible chat-completions envelope (primary provider).
//!
//! Bearer auth, `{model, messages, max_tokens, temperature}` body, reply at
//! `choices[0].message.content`.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::config::ChatConfig;
use crate::chat::error::{ChatResult, ProviderError};
use crate::chat::message::HistoryEntry;
use crate::chat::transport::HttpRequest;

/// Build the request for `user_message` following `history`.
///
/// # Errors
/// Returns an error if the endpoint is not a valid URL or the body cannot be
/// serialized.
pub fn build_request(
    config: &ChatConfig,
    api_key: &str,
    history: &[HistoryEntry],
    user_message: &str,
) -> ChatResult<HttpRequest> {
    let endpoint = Url::parse(&config.primary.endpoint)?;

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(WireMessage {
        role: "system",
        content: &config.persona_prompt,
    });
    messages.extend(history.iter().map(|entry| WireMessage {
        role: entry.role.as_str(),
        content: &entry.content,
    }));
    messages.push(WireMessage {
        role: "user",
        content: user_message,
    });

    let body = serde_json::to_value(ChatCompletionRequest {
        model: &config.primary.model,
        messages,
        max_tokens: config.primary.max_tokens,
        temperature: config.primary.temperature,
    })?;

    Ok(HttpRequest::post_json(endpoint, body)
        .with_header("Authorization", format!("Bearer {api_key}")))
}

/// Extract the reply text from a success body.
///
/// # Errors
/// [`ProviderError::Malformed`] if the body is not the expected JSON,
/// [`ProviderError::EmptyReply`] if the text is absent or blank.
pub fn parse_reply(body: &str) -> Result<String, ProviderError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ProviderError::EmptyReply)
}

// Wire structures

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
