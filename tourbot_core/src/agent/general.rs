use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::scope::{ScopeGuard, ScopeVerdict};
use super::{Responder, build_messages, strip_speaker_tag};
use crate::policy::Policy;
use crate::routing::Gazetteer;
use crate::tools::ToolRegistry;
use crate::window::ConversationWindow;
use crate::{GenerationRequest, GenerationSettings, LLMProvider};

/// Answers travel and geography questions, grounded with web search.
pub struct GeneralResponder {
    provider: Arc<dyn LLMProvider>,
    policy: Arc<Policy>,
    gazetteer: Arc<Gazetteer>,
    tools: ToolRegistry,
    settings: GenerationSettings,
}

impl GeneralResponder {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        policy: Arc<Policy>,
        gazetteer: Arc<Gazetteer>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            policy,
            gazetteer,
            tools: ToolRegistry::new(),
            settings,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    fn system_prompt(&self) -> String {
        let messages = &self.policy.messages;
        let keywords = self.policy.keyword_line();
        let tools = self.tools.describe();
        let tool_names = self.tools.names();
        self.policy.templates.chat.render(&[
            ("refusal", messages.refusal.as_str()),
            ("identity", messages.identity.as_str()),
            ("keywords", keywords.as_str()),
            ("tools", tools.as_str()),
            ("tool_names", tool_names.as_str()),
        ])
    }
}

#[async_trait]
impl Responder for GeneralResponder {
    async fn respond(
        &self,
        window: &ConversationWindow,
        utterance: &str,
    ) -> anyhow::Result<String> {
        let verdict = ScopeGuard::new(&self.policy, &self.gazetteer).check(window, utterance);
        debug!("Scope verdict: {verdict:?}");
        match verdict {
            ScopeVerdict::OutOfScope => return Ok(self.policy.messages.refusal.clone()),
            ScopeVerdict::Identity => return Ok(self.policy.messages.identity.clone()),
            ScopeVerdict::InScope => {}
        }

        let messages = build_messages(self.system_prompt(), window, utterance);
        let mut request = GenerationRequest::new(&messages, &self.settings);
        if !self.tools.is_empty() {
            request = request.with_tools(&self.tools);
        }

        info!("General responder answering with {} tools", self.tools.len());
        let response = self.provider.generate(request).await?;
        let text = strip_speaker_tag(&response.content);
        if text.is_empty() {
            anyhow::bail!("text generator returned an empty answer");
        }
        Ok(text.to_string())
    }
}
