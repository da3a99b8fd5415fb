//! One open chat panel: its log, its resolver, and the submission flow.

use std::sync::Arc;

use tracing::debug;

use crate::chat::error::{ChatError, ChatResult};
use crate::chat::ids::SessionId;
use crate::chat::message::{Message, Role};
use crate::chat::resolver::{Resolution, ResponseResolver};
use crate::chat::speech::{speakable_text, SpeechCapability};
use crate::chat::store::ConversationStore;

/// A chat session.
///
/// Submissions take `&mut self`, so a second message cannot be submitted while
/// a reply is still pending.
pub struct ChatSession {
    id: SessionId,
    store: ConversationStore,
    resolver: Arc<ResponseResolver>,
}

impl ChatSession {
    /// Start an empty session.
    #[must_use]
    pub fn new(resolver: Arc<ResponseResolver>) -> Self {
        Self::with_id(SessionId::new(), resolver)
    }

    /// Start an empty session under a known identifier.
    #[must_use]
    pub const fn with_id(id: SessionId, resolver: Arc<ResponseResolver>) -> Self {
        Self {
            id,
            store: ConversationStore::new(),
            resolver,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Full message log.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.store.all()
    }

    /// Submit typed text and wait for the assistant reply.
    ///
    /// # Errors
    /// Returns [`ChatError::EmptyMessage`] for blank input; the resolver is
    /// not invoked and nothing is appended.
    pub async fn submit(&mut self, text: &str) -> ChatResult<Message> {
        self.submit_detailed(text).await.map(|(message, _)| message)
    }

    /// Like [`ChatSession::submit`], also returning how the reply was produced.
    ///
    /// # Errors
    /// Returns [`ChatError::EmptyMessage`] for blank input.
    pub async fn submit_detailed(&mut self, text: &str) -> ChatResult<(Message, Resolution)> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // The new message travels separately from the history snapshot.
        let history = self
            .store
            .recent_for_api(self.resolver.config().history_window);
        let user = Message::new(Role::User, text);

        // Nothing is logged until the reply exists: a submission dropped
        // mid-resolution leaves the log untouched.
        let resolution = self.resolver.resolve_detailed(text, &history).await;
        let reply = self.store.append_exchange(user, resolution.reply.as_str());
        debug!(session = %self.id, strategy = ?resolution.strategy, "reply appended");

        Ok((reply, resolution))
    }

    /// Listen for one utterance, submit it, and speak the reply.
    ///
    /// # Errors
    /// Returns an error if speech is unavailable, recognition fails, or the
    /// transcript is blank.
    pub async fn submit_voice(&mut self, speech: &dyn SpeechCapability) -> ChatResult<Message> {
        if !speech.is_available() {
            return Err(ChatError::SpeechUnavailable);
        }

        let transcript = speech.start_listening().await?;
        let reply = self.submit(&transcript).await?;

        let spoken = speakable_text(reply.content());
        if !spoken.is_empty() {
            speech.speak(&spoken);
        }

        Ok(reply)
    }
}
