use std::sync::Arc;

use async_trait::async_trait;
use tourbot_core::catalog::render_entries;
use tourbot_core::tools::query_argument;
use tourbot_core::{KnowledgeLookup, Tool, ToolResult};
use tracing::{info, warn};

/// Catalog lookup exposed to the generator.
pub struct ProductSearchTool {
    knowledge: Arc<dyn KnowledgeLookup>,
    empty_message: String,
}

impl ProductSearchTool {
    pub const NAME: &'static str = "ProductSearch";

    pub fn new(knowledge: Arc<dyn KnowledgeLookup>, empty_message: impl Into<String>) -> Self {
        Self {
            knowledge,
            empty_message: empty_message.into(),
        }
    }
}

#[async_trait]
impl Tool for ProductSearchTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "查询产品库，输入应该是'**的旅游产品'"
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let Some(query) = query_argument(&input) else {
            return ToolResult::error("Missing required parameter: query")
                .with_error_type("invalid_input");
        };

        match self.knowledge.lookup(query).await {
            Ok(entries) if entries.is_empty() => ToolResult::success(self.empty_message.clone()),
            Ok(entries) => {
                info!("ProductSearch {query:?}: {} entries", entries.len());
                ToolResult::success(render_entries(&entries))
            }
            Err(e) => {
                warn!("ProductSearch {query:?} failed: {e}");
                ToolResult::error(format!("Product lookup failed: {e}"))
                    .with_error_type("lookup_error")
            }
        }
    }
}
