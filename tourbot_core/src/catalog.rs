//! Product catalog records and the lookup seam used by routing and sales.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A sellable travel product. Read-only to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(deserialize_with = "price_from_any")]
    pub price: String,
    pub itinerary: String,
    /// Places the product covers, used both for retrieval and to extend
    /// the gazetteer.
    #[serde(default)]
    pub destinations: Vec<String>,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        itinerary: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            itinerary: itinerary.into(),
            destinations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_destinations<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destinations = destinations.into_iter().map(Into::into).collect();
        self
    }

    /// Name and destinations: what the product is about. A topic has to
    /// appear here for the entry to correspond to it.
    #[must_use]
    pub fn subject_text(&self) -> String {
        let mut text = self.name.clone();
        for destination in &self.destinations {
            text.push(' ');
            text.push_str(destination);
        }
        text
    }

    /// Subject plus itinerary, for retrieval scoring.
    #[must_use]
    pub fn search_text(&self) -> String {
        let mut text = self.subject_text();
        text.push(' ');
        text.push_str(&self.itinerary);
        text
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "产品名称：{}\n产品价格：{}\n行程安排：{}",
            self.name, self.price, self.itinerary
        )
    }
}

/// Render entries the way they are handed to the generator.
#[must_use]
pub fn render_entries(entries: &[CatalogEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("[{}]\n{entry}", i + 1))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn price_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "price must be a string or number, got {other}"
        ))),
    }
}

/// Free-text search over the product catalog, most relevant entries first.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<CatalogEntry>>;
}

#[async_trait]
impl<T: KnowledgeLookup + ?Sized> KnowledgeLookup for std::sync::Arc<T> {
    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        (**self).lookup(query).await
    }
}
