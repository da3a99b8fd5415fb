//! Append-only conversation log.

use crate::chat::message::{HistoryEntry, Message, Role};

/// Number of trailing entries handed to upstream providers by default.
pub const API_HISTORY_WINDOW: usize = 10;

/// Ordered, append-only log of the messages in one chat session.
///
/// The full log is kept for rendering; [`ConversationStore::recent_for_api`]
/// derives the bounded view sent upstream.
#[derive(Clone, Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Create a message with the current timestamp, append it, and return it.
    ///
    /// Callers reject blank submissions before reaching the store.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Message {
        let message = Message::new(role, content);
        self.messages.push(message.clone());
        message
    }

    /// Append a user message created earlier together with the assistant reply.
    ///
    /// Both entries land in one call, so the log never holds a user turn
    /// without its reply.
    pub fn append_exchange(&mut self, user: Message, reply: impl Into<String>) -> Message {
        self.messages.push(user);
        self.append(Role::Assistant, reply)
    }

    /// The last `limit` entries in original order, timestamps stripped.
    #[must_use]
    pub fn recent_for_api(&self, limit: usize) -> Vec<HistoryEntry> {
        let start = self.messages.len().saturating_sub(limit);
        self.messages[start..]
            .iter()
            .map(Message::to_history_entry)
            .collect()
    }

    /// Full ordered log.
    #[must_use]
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing was appended yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(count: usize) -> ConversationStore {
        let mut store = ConversationStore::new();
        for i in 0..count {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store.append(role, format!("message {i}"));
        }
        store
    }

    #[test]
    fn test_append_returns_stored_message() {
        let mut store = ConversationStore::new();
        let message = store.append(Role::User, "hello");
        assert_eq!(store.len(), 1);
        assert_eq!(store.last(), Some(&message));
        assert_eq!(message.content(), "hello");
    }

    #[test]
    fn test_recent_for_api_is_bounded() {
        for count in [0, 3, 10, 11, 25] {
            let store = filled(count);
            let recent = store.recent_for_api(API_HISTORY_WINDOW);
            assert_eq!(recent.len(), count.min(API_HISTORY_WINDOW));
        }
    }

    #[test]
    fn test_recent_for_api_keeps_most_recent_in_order() {
        let store = filled(25);
        let recent = store.recent_for_api(API_HISTORY_WINDOW);
        let contents: Vec<&str> = recent.iter().map(|e| e.content.as_str()).collect();
        let expected: Vec<String> = (15..25).map(|i| format!("message {i}")).collect();
        assert_eq!(contents, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_full_log_retained_beyond_window() {
        let store = filled(25);
        assert_eq!(store.all().len(), 25);
        assert_eq!(store.all()[0].content(), "message 0");
    }

    #[test]
    fn test_timestamps_are_non_decreasing() {
        let store = filled(5);
        let stamps: Vec<_> = store.all().iter().map(Message::timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_append_exchange_keeps_user_before_reply() {
        let mut store = filled(2);
        let user = Message::new(Role::User, "why?");
        let reply = store.append_exchange(user.clone(), "because!");

        assert_eq!(store.len(), 4);
        assert_eq!(store.all()[2], user);
        assert_eq!(store.last(), Some(&reply));
        assert_eq!(reply.role(), Role::Assistant);
        assert!(user.timestamp() <= reply.timestamp());
    }

    #[test]
    fn test_zero_limit_returns_nothing() {
        assert!(filled(4).recent_for_api(0).is_empty());
    }
}
