//! Tool descriptors handed to the text generator.

mod registry;

pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Tool definition for LLM tool calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Result of tool execution
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    pub duration_ms: Option<u128>,
    pub error_type: Option<String>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            duration_ms: None,
            error_type: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            duration_ms: None,
            error_type: Some("tool_error".to_string()),
        }
    }

    #[must_use]
    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }
}

/// A capability the generator may invoke: a name, a description and a
/// query-in, text-out entry point.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Tools take a single free-text `query` unless they say otherwise.
    fn parameters(&self) -> serde_json::Value {
        schema_object(
            json!({
                "query": {
                    "type": "string",
                    "description": "Free-text query"
                }
            }),
            &["query"],
        )
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters(),
        }
    }
}

/// Pull the `query` argument out of a tool call. Generators sometimes pass
/// a bare string instead of an object.
#[must_use]
pub fn query_argument(input: &serde_json::Value) -> Option<&str> {
    input
        .get("query")
        .and_then(serde_json::Value::as_str)
        .or_else(|| input.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
}

/// Helper to build JSON schema
#[must_use]
#[allow(clippy::needless_pass_by_value)]
pub fn schema_object(properties: serde_json::Value, required: &[&str]) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
