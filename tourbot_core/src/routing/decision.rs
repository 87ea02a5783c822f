//! Classifies whether the interest topic matches a catalog product.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::gazetteer::Gazetteer;
use super::interest::InterestTopic;
use crate::catalog::{CatalogEntry, KnowledgeLookup, render_entries};
use crate::policy::Policy;
use crate::tools::ToolRegistry;
use crate::window::ConversationWindow;
use crate::{ChatMessage, GenerationRequest, GenerationSettings, LLMProvider};

/// Token the decision call emits when no product matches.
pub const NO_MATCH_TOKEN: &str = "1";
/// Token the decision call emits when a product matches.
pub const MATCH_TOKEN: &str = "2";

/// Validated output of the decision step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSignal {
    Match,
    NoMatch,
    /// The decision call answered with something other than a decision
    /// token. Carries the raw output for logging.
    Malformed(String),
}

impl MatchSignal {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Why the decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    NoTopic,
    LookupFailed,
    NoEntries,
    NoCorrespondingEntry,
    Model,
}

#[derive(Debug, Clone)]
pub struct DecisionReport {
    pub signal: MatchSignal,
    pub reason: DecisionReason,
    /// Entries that correspond to the topic, most relevant first.
    pub candidates: Vec<CatalogEntry>,
    /// Raw decision output, when the model was asked.
    pub raw: Option<String>,
}

impl DecisionReport {
    const fn short_circuit(reason: DecisionReason) -> Self {
        Self {
            signal: MatchSignal::NoMatch,
            reason,
            candidates: Vec::new(),
            raw: None,
        }
    }
}

/// Parse the decision output. Accepts the bare token with surrounding
/// whitespace, optionally prefixed by `AI:`; anything else is malformed.
#[must_use]
pub fn parse_decision(raw: &str) -> MatchSignal {
    let trimmed = raw.trim();
    let token = trimmed
        .strip_prefix("AI:")
        .or_else(|| trimmed.strip_prefix("AI："))
        .map_or(trimmed, str::trim);

    match token {
        NO_MATCH_TOKEN => MatchSignal::NoMatch,
        MATCH_TOKEN => MatchSignal::Match,
        _ => MatchSignal::Malformed(raw.to_string()),
    }
}

/// Entries from a lookup that are about `topic`.
#[must_use]
pub fn corresponding_entries(
    topic: &InterestTopic,
    entries: Vec<CatalogEntry>,
    gazetteer: &Gazetteer,
) -> Vec<CatalogEntry> {
    entries
        .into_iter()
        .filter(|entry| topic.corresponds_to(entry, gazetteer))
        .collect()
}

pub struct MatchDecision {
    provider: Arc<dyn LLMProvider>,
    knowledge: Arc<dyn KnowledgeLookup>,
    gazetteer: Arc<Gazetteer>,
    policy: Arc<Policy>,
    tools: ToolRegistry,
    settings: GenerationSettings,
}

impl MatchDecision {
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
            tools: ToolRegistry::new(),
            settings,
        }
    }

    /// Tools the decision call may use to re-query the catalog.
    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Decide whether `topic` matches a catalog product.
    ///
    /// An empty topic, a failed lookup, an empty result and a result with no
    /// entry about the topic are all `NoMatch` without a generation call.
    /// Otherwise the generator confirms the match with a single token.
    /// Only a generation failure is returned as an error.
    pub async fn decide(
        &self,
        window: &ConversationWindow,
        utterance: &str,
        topic: &InterestTopic,
    ) -> anyhow::Result<DecisionReport> {
        if !topic.is_identified() {
            return Ok(DecisionReport::short_circuit(DecisionReason::NoTopic));
        }

        let label = topic.label();
        let query = self.policy.product_query(&label);
        let entries = match self.knowledge.lookup(&query).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Knowledge lookup failed for {query:?}: {e}, treating as no match");
                return Ok(DecisionReport::short_circuit(DecisionReason::LookupFailed));
            }
        };
        info!("Knowledge lookup {query:?} returned {} entries", entries.len());

        if entries.is_empty() {
            return Ok(DecisionReport::short_circuit(DecisionReason::NoEntries));
        }

        let candidates = corresponding_entries(topic, entries, &self.gazetteer);
        if candidates.is_empty() {
            debug!("No looked-up entry corresponds to topic {topic}");
            return Ok(DecisionReport::short_circuit(
                DecisionReason::NoCorrespondingEntry,
            ));
        }

        let products = render_entries(&candidates);
        let history = window.render();
        let tools = self.tools.describe();
        let tool_names = self.tools.names();
        let prompt = self.policy.templates.route.render(&[
            ("topic", label.as_str()),
            ("products", products.as_str()),
            ("chat_history", history.as_str()),
            ("input", utterance),
            ("tools", tools.as_str()),
            ("tool_names", tool_names.as_str()),
        ]);
        let messages = [ChatMessage::system(prompt)];
        let mut request = GenerationRequest::new(&messages, &self.settings);
        if !self.tools.is_empty() {
            request = request.with_tools(&self.tools);
        }

        let response = self.provider.generate(request).await?;
        let signal = parse_decision(&response.content);
        if let MatchSignal::Malformed(raw) = &signal {
            warn!("Malformed decision output {raw:?}");
        } else {
            debug!("Decision output {:?} -> {signal:?}", response.content);
        }

        Ok(DecisionReport {
            signal,
            reason: DecisionReason::Model,
            candidates,
            raw: Some(response.content),
        })
    }
}
