//! Deterministic collaborators for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::{CatalogEntry, KnowledgeLookup};
use crate::{ChatMessage, GenerationRequest, GenerationSettings, LLMProvider, LLMResponse};

#[derive(Debug, Clone)]
pub enum Step {
    Reply(String),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub settings: GenerationSettings,
    pub tool_names: Vec<String>,
}

/// Replays scripted replies in order and records every request. Running
/// out of script is an error.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(replies.into_iter().map(|r| Step::Reply(r.into())))
    }

    pub fn from_steps(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self::from_steps([Step::Fail(reason.into())])
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(&self, request: GenerationRequest<'_>) -> anyhow::Result<LLMResponse> {
        let recorded = RecordedRequest {
            messages: request.messages.to_vec(),
            settings: request.settings.clone(),
            tool_names: request
                .tools
                .map(|t| t.definitions().into_iter().map(|d| d.name).collect())
                .unwrap_or_default(),
        };
        self.requests
            .lock()
            .map_err(|_| anyhow::anyhow!("request log poisoned"))?
            .push(recorded);

        let step = self
            .steps
            .lock()
            .map_err(|_| anyhow::anyhow!("script poisoned"))?
            .pop_front();
        match step {
            Some(Step::Reply(content)) => Ok(LLMResponse {
                content,
                usage: None,
            }),
            Some(Step::Fail(reason)) => Err(anyhow::anyhow!(reason)),
            None => Err(anyhow::anyhow!("scripted provider has no reply left")),
        }
    }

    fn get_default_model(&self) -> &str {
        "scripted"
    }
}

/// Fixed catalog. By default an entry is returned when its name or one of
/// its destinations occurs in the query.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
    unfiltered: bool,
    failing: bool,
    queries: Mutex<Vec<String>>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    /// Returns every entry for every query.
    #[must_use]
    pub fn unfiltered(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            unfiltered: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl KnowledgeLookup for StaticCatalog {
    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        if self.failing {
            anyhow::bail!("catalog unavailable");
        }
        if self.unfiltered {
            return Ok(self.entries.clone());
        }
        Ok(self
            .entries
            .iter()
            .filter(|e| {
                query.contains(&e.name) || e.destinations.iter().any(|d| query.contains(d.as_str()))
            })
            .cloned()
            .collect())
    }
}
