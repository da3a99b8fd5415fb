//! Optional voice input and spoken playback.
//!
//! Only [`ChatSession`](crate::chat::ChatSession) talks to this interface;
//! the resolver and the store never do. Clients without speech support use
//! [`NoSpeech`].

use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use regex::Regex;

use crate::chat::error::{ChatError, ChatResult};

/// Boxed future type for speech operations.
pub type SpeechFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Pictographs, regional indicators, variation selectors, joiners and keycaps.
static EMOJI: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[\p{Extended_Pictographic}\x{1F1E6}-\x{1F1FF}\x{FE0E}\x{FE0F}\x{200D}\x{20E3}\x{1F3FB}-\x{1F3FF}]")
        .ok()
});

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Narrow speech capability: one-shot transcription and playback.
pub trait SpeechCapability: Send + Sync {
    /// Whether voice controls should be offered at all.
    fn is_available(&self) -> bool;

    /// Listen for a single utterance and return its final transcript.
    ///
    /// # Errors
    /// Returns an error if the capability is missing or recognition fails.
    fn start_listening(&self) -> SpeechFuture<'_, ChatResult<String>>;

    /// Speak `text` aloud. Fire-and-forget.
    fn speak(&self, text: &str);
}

/// Absent capability: nothing is available, listening fails, speaking is a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSpeech;

impl SpeechCapability for NoSpeech {
    fn is_available(&self) -> bool {
        false
    }

    fn start_listening(&self) -> SpeechFuture<'_, ChatResult<String>> {
        Box::pin(async { Err(ChatError::SpeechUnavailable) })
    }

    fn speak(&self, _text: &str) {}
}

/// Text suitable for synthesis: emoji removed and whitespace collapsed.
#[must_use]
pub fn speakable_text(text: &str) -> String {
    let stripped = match EMOJI.as_ref() {
        Some(emoji) => emoji.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };
    let collapsed = match WHITESPACE.as_ref() {
        Some(ws) => ws.replace_all(&stripped, " ").into_owned(),
        None => stripped,
    };
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_emoji() {
        assert_eq!(speakable_text("Great job! 🎉🚀"), "Great job!");
        assert_eq!(speakable_text("Space is amazing! 🚀 Did you know?"), "Space is amazing! Did you know?");
    }

    #[test]
    fn test_strips_joined_and_flag_sequences() {
        assert_eq!(speakable_text("family 👨‍👩‍👧 time"), "family time");
        assert_eq!(speakable_text("hello 🇫🇷 friend"), "hello friend");
        assert_eq!(speakable_text("thumbs 👍🏽 up"), "thumbs up");
    }

    #[test]
    fn test_keeps_digits_and_punctuation() {
        assert_eq!(speakable_text("2 + 2 = 4, right? #1"), "2 + 2 = 4, right? #1");
    }

    #[test]
    fn test_emoji_only_becomes_empty() {
        assert_eq!(speakable_text(" ✨🌈 "), "");
    }

    #[tokio::test]
    async fn test_no_speech_is_unavailable() {
        let speech = NoSpeech;
        assert!(!speech.is_available());
        assert!(matches!(
            speech.start_listening().await,
            Err(ChatError::SpeechUnavailable)
        ));
        speech.speak("ignored");
    }
}
