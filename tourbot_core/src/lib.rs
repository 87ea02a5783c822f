#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod agent;
pub mod catalog;
pub mod policy;
pub mod routing;
pub mod template;
pub mod tools;
pub mod window;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{
    GeneralResponder, Responder, SalesResponder, ScopeGuard, ScopeVerdict, WelcomeGenerator,
};
pub use catalog::{CatalogEntry, KnowledgeLookup};
pub use policy::{Place, Policy, PolicyError};
pub use routing::{
    Gazetteer, InterestExtractor, InterestTopic, MatchDecision, MatchSignal, RouteOutcome, Router,
    RouterState, RoutingDecision,
};
pub use tools::{Tool, ToolDefinition, ToolRegistry, ToolResult};
pub use window::ConversationWindow;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One recorded message. Turns in a transcript are never mutated after
/// they are pushed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Conversation turn as seen by the routing layer.
pub type Turn = ChatMessage;

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn accumulate(&mut self, other: &Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self
            .completion_tokens
            .saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// Sampling parameters for one kind of generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.6,
            max_tokens: 2048,
        }
    }
}

/// A filled prompt plus the tools the generator may invoke while answering.
#[derive(Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub settings: &'a GenerationSettings,
    pub tools: Option<&'a ToolRegistry>,
}

impl<'a> GenerationRequest<'a> {
    #[must_use]
    pub const fn new(messages: &'a [ChatMessage], settings: &'a GenerationSettings) -> Self {
        Self {
            messages,
            settings,
            tools: None,
        }
    }

    #[must_use]
    pub const fn with_tools(mut self, tools: &'a ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }
}

/// Text generation backend.
///
/// Implementations own the tool-invocation loop: when `request.tools` is set
/// they may call any registered tool any number of times before returning
/// the final text.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<LLMResponse>;
    fn get_default_model(&self) -> &str;
}

#[async_trait]
impl<T: LLMProvider + ?Sized> LLMProvider for std::sync::Arc<T> {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<LLMResponse> {
        (**self).generate(request).await
    }

    fn get_default_model(&self) -> &str {
        (**self).get_default_model()
    }
}
