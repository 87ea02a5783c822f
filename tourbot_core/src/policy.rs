//! Versioned policy data: prompt templates, fixed messages, keyword lists
//! and the place gazetteer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::template::PromptTemplate;

const BUILTIN_POLICY: &str = include_str!("../policy/default.json");

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid policy: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Templates {
    pub route: PromptTemplate,
    pub chat: PromptTemplate,
    pub sales: PromptTemplate,
    pub welcome: PromptTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    pub refusal: String,
    pub identity: String,
    pub apology: String,
    pub courtesy_opening: String,
    pub failure: String,
    pub welcome_fallback: String,
    pub no_products: String,
}

/// A gazetteer entry. `parent` names the enclosing region, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Place {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub version: String,
    pub templates: Templates,
    pub messages: Messages,
    pub product_query_pattern: PromptTemplate,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub off_topic_terms: Vec<String>,
    #[serde(default)]
    pub identity_terms: Vec<String>,
    #[serde(default)]
    pub places: Vec<Place>,
}

impl Policy {
    /// The policy shipped with the crate.
    pub fn builtin() -> Result<Self, PolicyError> {
        Self::from_json(BUILTIN_POLICY)
    }

    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_path(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.version.trim().is_empty() {
            return Err(PolicyError::Invalid("version must not be empty".to_string()));
        }
        if !self.product_query_pattern.placeholders().contains(&"topic") {
            return Err(PolicyError::Invalid(
                "product_query_pattern must contain {topic}".to_string(),
            ));
        }
        if !self.templates.route.placeholders().contains(&"input") {
            return Err(PolicyError::Invalid(
                "route template must contain {input}".to_string(),
            ));
        }
        if let Some(place) = self.places.iter().find(|p| p.name.trim().is_empty()) {
            return Err(PolicyError::Invalid(format!(
                "place with empty name (aliases: {:?})",
                place.aliases
            )));
        }
        Ok(())
    }

    /// Knowledge lookup query for a topic label, e.g. `北京的旅游产品`.
    #[must_use]
    pub fn product_query(&self, topic: &str) -> String {
        self.product_query_pattern.render(&[("topic", topic)])
    }

    /// Keyword list as it appears in the chat prompt.
    #[must_use]
    pub fn keyword_line(&self) -> String {
        format!("‘{}’", self.keywords.join("、"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_policy_parses() {
        let Ok(policy) = Policy::builtin() else {
            panic!("built-in policy must parse");
        };
        assert!(!policy.keywords.is_empty());
        assert!(policy.keywords.iter().any(|k| k == "美食"));
        assert!(policy.places.iter().any(|p| p.name == "故宫"));
        assert_eq!(policy.product_query("云南"), "云南的旅游产品");
    }

    #[test]
    fn rejects_pattern_without_topic() {
        let Ok(mut value) = serde_json::from_str::<serde_json::Value>(BUILTIN_POLICY) else {
            panic!("built-in policy must be json");
        };
        value["product_query_pattern"] = serde_json::json!("旅游产品");
        let result = Policy::from_json(&value.to_string());
        assert!(matches!(result, Err(PolicyError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = Policy::from_path(Path::new("/nonexistent/tourbot/policy.json"));
        assert!(matches!(result, Err(PolicyError::Io { .. })));
    }

    #[test]
    fn keyword_line_joins_terms() {
        let Ok(mut policy) = Policy::builtin() else {
            panic!("built-in policy must parse");
        };
        policy.keywords = vec!["玩".to_string(), "旅游".to_string()];
        assert_eq!(policy.keyword_line(), "‘玩、旅游’");
    }
}
