use std::sync::Arc;

use tracing::debug;

use super::strip_speaker_tag;
use crate::policy::Policy;
use crate::{ChatMessage, GenerationRequest, GenerationSettings, LLMProvider};

/// Style hint used when the caller does not ask for one.
pub const DEFAULT_WELCOME_STYLE: &str = "简短的欢迎词";

/// Produces the opening line of a session.
pub struct WelcomeGenerator {
    provider: Arc<dyn LLMProvider>,
    policy: Arc<Policy>,
    settings: GenerationSettings,
}

impl WelcomeGenerator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        policy: Arc<Policy>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            policy,
            settings,
        }
    }

    pub async fn generate(&self, style: &str) -> anyhow::Result<String> {
        let prompt = self.policy.templates.welcome.render(&[("style", style)]);
        let messages = [ChatMessage::system(prompt), ChatMessage::user(style)];
        let response = self
            .provider
            .generate(GenerationRequest::new(&messages, &self.settings))
            .await?;

        let text = strip_speaker_tag(&response.content)
            .trim_matches(|c| matches!(c, '"' | '“' | '”'))
            .trim();
        if text.is_empty() {
            anyhow::bail!("text generator returned an empty welcome message");
        }
        debug!("Welcome message: {text}");
        Ok(text.to_string())
    }

    /// The policy's fixed greeting, for when generation fails.
    #[must_use]
    pub fn fallback(&self) -> &str {
        &self.policy.messages.welcome_fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn generator(provider: Arc<ScriptedProvider>) -> WelcomeGenerator {
        let Ok(policy) = Policy::builtin() else {
            panic!("built-in policy must parse");
        };
        WelcomeGenerator::new(provider, Arc::new(policy), GenerationSettings::default())
    }

    #[tokio::test]
    async fn strips_quotes_and_speaker_tag() {
        let provider = Arc::new(ScriptedProvider::new(["AI: “嗨，旅行家！你最想去哪儿？”"]));
        let Ok(text) = generator(provider.clone()).generate(DEFAULT_WELCOME_STYLE).await else {
            panic!("welcome expected");
        };
        assert_eq!(text, "嗨，旅行家！你最想去哪儿？");
        assert!(provider.requests()[0].messages[0].content.contains("简短的欢迎词"));
    }

    #[tokio::test]
    async fn empty_welcome_is_an_error() {
        let provider = Arc::new(ScriptedProvider::new(["\"\""]));
        assert!(generator(provider).generate(DEFAULT_WELCOME_STYLE).await.is_err());
    }
}
