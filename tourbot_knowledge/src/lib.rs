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

pub mod loader;
pub mod scoring;

use std::path::Path;

use async_trait::async_trait;
use tourbot_core::{CatalogEntry, KnowledgeLookup};
use tracing::debug;

pub use loader::{CatalogError, load_catalog};
pub use scoring::{coverage, keyword_overlap};

/// Bonus per destination of an entry that appears verbatim in the query.
const DESTINATION_BOOST: f64 = 1.0;
/// Weight of how much of the product name the query covers.
const NAME_WEIGHT: f64 = 0.5;

/// In-memory product catalog with lexical retrieval.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<CatalogEntry>,
    top_k: usize,
    min_score: f64,
}

impl KnowledgeBase {
    pub const DEFAULT_TOP_K: usize = 4;
    pub const DEFAULT_MIN_SCORE: f64 = 0.05;

    #[must_use]
    pub const fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            top_k: Self::DEFAULT_TOP_K,
            min_score: Self::DEFAULT_MIN_SCORE,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        Ok(Self::new(load_catalog(path)?))
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub const fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn score(query: &str, entry: &CatalogEntry) -> f64 {
        let destinations = entry
            .destinations
            .iter()
            .filter(|d| query.contains(d.as_str()))
            .count();

        #[allow(clippy::cast_precision_loss)]
        let boost = destinations as f64 * DESTINATION_BOOST;

        keyword_overlap(query, &entry.search_text())
            + NAME_WEIGHT * coverage(&entry.name, query)
            + boost
    }

    /// Entries scoring at least `min_score`, best first. Ties keep catalog
    /// order so repeated lookups return the same sequence.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<CatalogEntry> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &CatalogEntry)> = self
            .entries
            .iter()
            .map(|entry| (Self::score(query, entry), entry))
            .filter(|(score, _)| *score >= self.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        debug!(
            "Catalog search {query:?}: {} of {} entries above {}",
            scored.len(),
            self.entries.len(),
            self.min_score
        );

        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, entry)| entry.clone())
            .collect()
    }
}

#[async_trait]
impl KnowledgeLookup for KnowledgeBase {
    async fn lookup(&self, query: &str) -> anyhow::Result<Vec<CatalogEntry>> {
        Ok(self.search(query))
    }
}
