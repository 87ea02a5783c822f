//! Response generators the router dispatches to.

mod general;
mod sales;
mod scope;
mod welcome;

pub use general::GeneralResponder;
pub use sales::{SalesResponder, templated_recommendation};
pub use scope::{ScopeGuard, ScopeVerdict};
pub use welcome::{DEFAULT_WELCOME_STYLE, WelcomeGenerator};

use async_trait::async_trait;

use crate::ChatMessage;
use crate::window::ConversationWindow;

/// A response path: given the window and the new utterance, produce the
/// text shown to the user.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, window: &ConversationWindow, utterance: &str)
    -> anyhow::Result<String>;
}

/// System prompt, then the window, then the new user message.
#[must_use]
pub fn build_messages(
    system_prompt: String,
    window: &ConversationWindow,
    utterance: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(window.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(window.to_messages());
    messages.push(ChatMessage::user(utterance));
    messages
}

/// Drop a leading `AI:` speaker tag some models echo back from the prompt.
#[must_use]
pub fn strip_speaker_tag(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("AI:")
        .or_else(|| trimmed.strip_prefix("AI："))
        .map_or(trimmed, str::trim)
}
