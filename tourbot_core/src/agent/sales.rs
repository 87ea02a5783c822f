use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Responder, strip_speaker_tag};
use crate::catalog::{CatalogEntry, KnowledgeLookup, render_entries};
use crate::policy::Policy;
use crate::routing::{Gazetteer, InterestExtractor, InterestTopic, corresponding_entries};
use crate::window::ConversationWindow;
use crate::{ChatMessage, GenerationRequest, GenerationSettings, LLMProvider};

/// Recommends a catalog product matching the user's interest.
pub struct SalesResponder {
    provider: Arc<dyn LLMProvider>,
    knowledge: Arc<dyn KnowledgeLookup>,
    gazetteer: Arc<Gazetteer>,
    policy: Arc<Policy>,
    settings: GenerationSettings,
    lookback: usize,
}

impl SalesResponder {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        knowledge: Arc<dyn KnowledgeLookup>,
        gazetteer: Arc<Gazetteer>,
        policy: Arc<Policy>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            knowledge,
            gazetteer,
            policy,
            settings,
            lookback: InterestExtractor::DEFAULT_LOOKBACK,
        }
    }

    #[must_use]
    pub const fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    async fn find_products(&self, topic: &InterestTopic) -> Vec<CatalogEntry> {
        if !topic.is_identified() {
            return Vec::new();
        }
        let query = self.policy.product_query(&topic.label());
        match self.knowledge.lookup(&query).await {
            Ok(entries) => corresponding_entries(topic, entries, &self.gazetteer),
            Err(e) => {
                warn!("Knowledge lookup failed for {query:?}: {e}");
                Vec::new()
            }
        }
    }

    /// Keep the generated text only if it opens with the courtesy phrase and
    /// names the product and its price.
    fn accept<'t>(&self, text: &'t str, product: &CatalogEntry) -> Option<&'t str> {
        let text = strip_speaker_tag(text);
        let opening = self.policy.messages.courtesy_opening.as_str();
        (text.starts_with(opening) && text.contains(&product.name) && text.contains(&product.price))
            .then_some(text)
    }
}

/// Recommendation built straight from the catalog entry.
#[must_use]
pub fn templated_recommendation(policy: &Policy, product: &CatalogEntry) -> String {
    format!(
        "{}：{}。产品价格：{}。行程安排：{}",
        policy.messages.courtesy_opening, product.name, product.price, product.itinerary
    )
}

#[async_trait]
impl Responder for SalesResponder {
    async fn respond(
        &self,
        window: &ConversationWindow,
        utterance: &str,
    ) -> anyhow::Result<String> {
        let topic = InterestExtractor::new(&self.gazetteer)
            .with_lookback(self.lookback)
            .extract(window, utterance);
        let products = self.find_products(&topic).await;

        let Some(primary) = products.first() else {
            info!("No product for topic {topic}, apologising");
            return Ok(self.policy.messages.apology.clone());
        };

        let mut history = window.render();
        if !history.is_empty() {
            history.push('\n');
        }
        history.push_str("用户: ");
        history.push_str(utterance);

        let label = topic.label();
        let rendered = render_entries(&products);
        let prompt = self.policy.templates.sales.render(&[
            ("topic", label.as_str()),
            ("products", rendered.as_str()),
            ("courtesy_opening", self.policy.messages.courtesy_opening.as_str()),
            ("chat_history", history.as_str()),
        ]);
        let messages = [ChatMessage::system(prompt), ChatMessage::user(utterance)];

        let response = self
            .provider
            .generate(GenerationRequest::new(&messages, &self.settings))
            .await?;

        if let Some(text) = self.accept(&response.content, primary) {
            Ok(text.to_string())
        } else {
            warn!(
                "Generated recommendation does not name {} at {}, using template",
                primary.name, primary.price
            );
            Ok(templated_recommendation(&self.policy, primary))
        }
    }
}
