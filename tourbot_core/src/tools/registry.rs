use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{Tool, ToolDefinition, ToolResult};

/// Ordered set of tools. Order is kept so the numbered listing in prompts
/// is stable.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        info!("Registering tool: {}", tool.name());
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub async fn execute(&self, name: &str, input: serde_json::Value) -> ToolResult {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return ToolResult::error(format!("Unknown tool: {name}"))
                .with_error_type("unknown_tool");
        };
        let started = Instant::now();
        let mut result = tool.execute(input).await;
        result.duration_ms = Some(started.elapsed().as_millis());
        debug!(
            "Tool {} finished in {:?}ms (error={})",
            name, result.duration_ms, result.is_error
        );
        result
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Definitions in the chat-completions `tools` format.
    #[must_use]
    pub fn get_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters()
                    }
                })
            })
            .collect()
    }

    /// `1. name: description` lines for the `{tools}` placeholder.
    #[must_use]
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}: {}", i + 1, t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Comma-separated names for the `{tool_names}` placeholder.
    #[must_use]
    pub fn names(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
