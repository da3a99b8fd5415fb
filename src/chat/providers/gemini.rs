//! Gemini `generateContent` envelope (secondary provider).
//!
//! API key in the query string, persona in `systemInstruction`, assistant
//! turns sent with role `model`, reply at `candidates[0].content.parts[*].text`.

use serde::{Deserialize, Serialize};

use crate::chat::config::ChatConfig;
use crate::chat::error::{ChatResult, ProviderError};
use crate::chat::message::{HistoryEntry, Role};
use crate::chat::transport::HttpRequest;

/// Build the request for `user_message` following `history`.
///
/// # Errors
/// Returns an error if the URL is invalid or the body cannot be serialized.
pub fn build_request(
    config: &ChatConfig,
    api_key: &str,
    history: &[HistoryEntry],
    user_message: &str,
) -> ChatResult<HttpRequest> {
    let url = build_url(config, api_key)?;

    let mut contents: Vec<Content<'_>> = history
        .iter()
        .map(|entry| Content {
            role: wire_role(entry.role),
            parts: vec![Part {
                text: &entry.content,
            }],
        })
        .collect();
    contents.push(Content {
        role: wire_role(Role::User),
        parts: vec![Part { text: user_message }],
    });

    let body = serde_json::to_value(GenerateContentRequest {
        contents,
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: &config.persona_prompt,
            }],
        },
        generation_config: GenerationConfig {
            max_output_tokens: config.secondary.max_output_tokens,
            temperature: config.secondary.temperature,
            top_p: config.secondary.top_p,
        },
    })?;

    Ok(HttpRequest::post_json(url, body))
}

/// Extract the reply text from a success body.
///
/// # Errors
/// [`ProviderError::Malformed`] if the body is not the expected JSON,
/// [`ProviderError::EmptyReply`] if no text part is present.
pub fn parse_reply(body: &str) -> Result<String, ProviderError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyReply);
    }
    Ok(text.to_string())
}

/// `{endpoint}/models/{model}:generateContent?key={api_key}`
fn build_url(config: &ChatConfig, api_key: &str) -> ChatResult<String> {
    let mut url = url::Url::parse(&format!(
        "{}/models/{}:generateContent",
        config.secondary.endpoint.trim_end_matches('/'),
        config.secondary.model
    ))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.to_string())
}

const fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

// Wire structures

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_request_shape() {
        let config = ChatConfig::default();
        let history = [HistoryEntry::user("hi"), HistoryEntry::assistant("hello!")];
        let request = build_request(&config, "AIza-1", &history, "how do bees fly?").unwrap();

        assert!(request.url.starts_with(
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?"
        ));
        assert!(request.url.ends_with("key=AIza-1"));
        assert_eq!(request.header("authorization"), None);

        let body = &request.body;
        assert_eq!(
            body["contents"],
            json!([
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello!"}]},
                {"role": "user", "parts": [{"text": "how do bees fly?"}]},
            ])
        );
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            config.persona_prompt.as_str()
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 300);
        assert!(body["generationConfig"]["topP"].is_number());
    }

    #[test]
    fn test_key_is_url_encoded() {
        let config = ChatConfig::default();
        let url = build_url(&config, "a b&c").unwrap();
        assert!(url.ends_with("key=a+b%26c"));
    }

    #[test]
    fn test_parse_reply_joins_parts() {
        let body = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Bees "}, {"text": "buzz!"}]}}]
        })
        .to_string();
        assert_eq!(parse_reply(&body), Ok("Bees buzz!".to_string()));
    }

    #[test]
    fn test_parse_reply_empty_or_missing() {
        for body in [
            json!({"candidates": []}),
            json!({"promptFeedback": {"blockReason": "SAFETY"}}),
            json!({"candidates": [{"finishReason": "SAFETY"}]}),
            json!({"candidates": [{"content": {"parts": [{"text": ""}]}}]}),
        ] {
            assert_eq!(parse_reply(&body.to_string()), Err(ProviderError::EmptyReply));
        }
    }

    #[test]
    fn test_parse_reply_malformed() {
        assert!(matches!(parse_reply("nope"), Err(ProviderError::Malformed(_))));
    }
}
