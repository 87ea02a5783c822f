//! Session management for multi-turn conversations.
//!
//! A session holds the transcript of one conversation with a user, from the
//! welcome message onwards, plus its metadata.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tourbot_core::{ChatMessage, ConversationWindow, Role};

/// A conversation session with its full transcript.
///
/// The transcript is append-only: turns are never edited or removed.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    /// Session identifier
    pub id: Uuid,
    /// Session name (optional)
    pub name: Option<String>,
    /// Transcript, oldest first
    messages: Vec<ChatMessage>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ConversationSession {
    /// Create a new empty session with a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(Uuid::now_v7())
    }

    /// Create a new empty session with the given identifier.
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set session name.
    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Append a turn to the transcript.
    pub fn add_message(&mut self, role: Role, content: String) {
        self.messages.push(ChatMessage { role, content });
        self.updated_at = Utc::now();
    }

    /// Get the full transcript.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Get the last N messages from history.
    #[must_use]
    pub fn last_n_messages(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// The last `bound` turns as routing context.
    #[must_use]
    pub fn window(&self, bound: usize) -> ConversationWindow {
        ConversationWindow::from_transcript(self.last_n_messages(bound), bound)
    }

    /// Get all user messages.
    #[must_use]
    pub fn user_messages(&self) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .collect()
    }

    /// Number of user turns so far.
    #[must_use]
    pub fn user_turn_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }

    /// Get message count.
    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Check if session is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_session() {
        let mut session = ConversationSession::new().with_name("Test".to_string());

        assert!(session.is_empty());

        session.add_message(Role::Assistant, "欢迎！".to_string());
        session.add_message(Role::User, "北京好玩吗".to_string());
        session.add_message(Role::Assistant, "很好玩".to_string());

        assert_eq!(session.message_count(), 3);
        assert_eq!(session.user_turn_count(), 1);

        let last = session.last_n_messages(1);
        assert_eq!(last[0].content, "很好玩");

        let user_msgs = session.user_messages();
        assert_eq!(user_msgs.len(), 1);
        assert_eq!(user_msgs[0].content, "北京好玩吗");
    }

    #[test]
    fn test_window_is_tail_of_transcript() {
        let mut session = ConversationSession::new();
        for i in 0..10 {
            session.add_message(Role::User, format!("Message {i}"));
        }

        let window = session.window(4);
        assert_eq!(window.len(), 4);
        assert_eq!(window.recent_user_contents(1), vec!["Message 9"]);
        assert!(session.window(0).is_empty());
        assert_eq!(session.window(100).len(), 10);
    }
}
