//! Bounded trailing slice of a transcript used as decision context.

use std::collections::VecDeque;

use crate::{ChatMessage, Role};

/// Most recent turns of a conversation, oldest first.
///
/// Never holds more than `bound` turns; pushing past the bound discards the
/// oldest turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationWindow {
    turns: VecDeque<ChatMessage>,
    bound: usize,
}

impl ConversationWindow {
    #[must_use]
    pub fn new(bound: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(bound),
            bound,
        }
    }

    /// Window over the tail of `transcript`. System and tool messages are
    /// not part of the conversation and are skipped.
    #[must_use]
    pub fn from_transcript(transcript: &[ChatMessage], bound: usize) -> Self {
        let mut window = Self::new(bound);
        for turn in transcript
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
        {
            window.push(turn.clone());
        }
        window
    }

    pub fn push(&mut self, turn: ChatMessage) {
        if self.bound == 0 {
            return;
        }
        while self.turns.len() >= self.bound {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    #[must_use]
    pub const fn bound(&self) -> usize {
        self.bound
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> impl Iterator<Item = &ChatMessage> {
        self.turns.iter()
    }

    /// Contents of the last `n` user turns, oldest first.
    #[must_use]
    pub fn recent_user_contents(&self, n: usize) -> Vec<&str> {
        let mut recent: Vec<&str> = self
            .turns
            .iter()
            .rev()
            .filter(|t| t.role == Role::User)
            .take(n)
            .map(|t| t.content.as_str())
            .collect();
        recent.reverse();
        recent
    }

    /// `用户: ...` / `AI: ...` lines, one per turn.
    #[must_use]
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|t| match t.role {
                Role::User => format!("用户: {}", t.content),
                _ => format!("AI: {}", t.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Turns in chat-completion message form.
    #[must_use]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.turns.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_discards_oldest_past_bound() {
        let mut window = ConversationWindow::new(4);
        for i in 0..6 {
            window.push(ChatMessage::user(format!("m{i}")));
        }
        assert_eq!(window.len(), 4);
        let first = window.turns().next().map(|t| t.content.clone());
        assert_eq!(first.as_deref(), Some("m2"));
    }

    #[test]
    fn zero_bound_stays_empty() {
        let mut window = ConversationWindow::new(0);
        window.push(ChatMessage::user("hello"));
        assert!(window.is_empty());
    }

    #[test]
    fn from_transcript_skips_system_messages() {
        let transcript = vec![
            ChatMessage::system("policy"),
            ChatMessage::assistant("欢迎"),
            ChatMessage::user("北京有哪些好玩的地方？"),
        ];
        let window = ConversationWindow::from_transcript(&transcript, 4);
        assert_eq!(window.len(), 2);
        assert_eq!(window.render(), "AI: 欢迎\n用户: 北京有哪些好玩的地方？");
    }

    #[test]
    fn recent_user_contents_are_chronological() {
        let transcript = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant("x"),
            ChatMessage::user("b"),
            ChatMessage::assistant("y"),
            ChatMessage::user("c"),
        ];
        let window = ConversationWindow::from_transcript(&transcript, 8);
        assert_eq!(window.recent_user_contents(2), vec!["b", "c"]);
        assert_eq!(window.recent_user_contents(10), vec!["a", "b", "c"]);
    }
}
