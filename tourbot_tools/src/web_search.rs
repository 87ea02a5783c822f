use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tourbot_core::tools::query_argument;
use tourbot_core::{Tool, ToolResult};
use tracing::{info, warn};
use url::Url;

/// Tavily search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    #[serde(default)]
    pub api_key: String,

    /// Results returned per query
    #[serde(default = "WebSearchConfig::default_max_results")]
    pub max_results: usize,

    /// Request timeout (seconds)
    #[serde(default = "WebSearchConfig::default_timeout")]
    pub timeout: u64,

    #[serde(default = "WebSearchConfig::default_endpoint")]
    pub endpoint: String,
}

impl WebSearchConfig {
    const fn default_max_results() -> usize {
        2
    }

    const fn default_timeout() -> u64 {
        15
    }

    fn default_endpoint() -> String {
        "https://api.tavily.com".to_string()
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: Self::default_max_results(),
            timeout: Self::default_timeout(),
            endpoint: Self::default_endpoint(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Thin client for the Tavily `/search` endpoint.
pub struct TavilySearch {
    client: Client,
    config: WebSearchConfig,
    search_url: Url,
}

impl TavilySearch {
    pub fn new(config: WebSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .context("Failed to create HTTP client")?;
        let base = Url::parse(&format!("{}/", config.endpoint.trim_end_matches('/')))
            .with_context(|| format!("Invalid search endpoint: {}", config.endpoint))?;
        let search_url = base.join("search").context("Invalid search endpoint")?;

        Ok(Self {
            client,
            config,
            search_url,
        })
    }

    async fn try_search(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .post(self.search_url.clone())
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "api_key": self.config.api_key,
                "query": query,
                "max_results": self.config.max_results,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        info!("Web search {query:?}: {} results", response.results.len());
        Ok(render_hits(&response.results))
    }

    /// Search the web. Never fails: errors come back as text so the
    /// generator can carry on without the results.
    pub async fn search_web(&self, query: &str) -> String {
        match self.try_search(query).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Web search {query:?} failed: {e}");
                format!("Error during web search: {e}")
            }
        }
    }
}

fn render_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".to_string();
    }
    hits.iter()
        .map(|hit| format!("{}\n{}\n{}", hit.title, hit.url, hit.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Web search exposed to the generator.
pub struct WebSearchTool {
    search: TavilySearch,
}

impl WebSearchTool {
    pub const NAME: &'static str = "WebSearch";

    pub fn new(config: WebSearchConfig) -> Result<Self> {
        Ok(Self {
            search: TavilySearch::new(config)?,
        })
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "使用 Tavily 搜索引擎查询互联网上的相关信息。"
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let Some(query) = query_argument(&input) else {
            return ToolResult::error("Missing required parameter: query")
                .with_error_type("invalid_input");
        };
        ToolResult::success(self.search.search_web(query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_apply_to_partial_json() {
        let Ok(config) = serde_json::from_str::<WebSearchConfig>(r#"{"api_key": "tvly"}"#) else {
            panic!("partial config should parse");
        };
        assert_eq!(config.api_key, "tvly");
        assert_eq!(config.max_results, 2);
        assert_eq!(config.endpoint, "https://api.tavily.com");
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let config = WebSearchConfig {
            endpoint: "not a url".to_string(),
            ..WebSearchConfig::default()
        };
        assert!(TavilySearch::new(config).is_err());
    }

    #[test]
    fn hits_render_in_order() {
        let hits = vec![
            SearchHit {
                title: "西湖".to_string(),
                url: "https://a.example".to_string(),
                content: " 西湖十景 ".to_string(),
            },
            SearchHit {
                title: "灵隐寺".to_string(),
                url: "https://b.example".to_string(),
                content: "古刹".to_string(),
            },
        ];
        assert_eq!(
            render_hits(&hits),
            "西湖\nhttps://a.example\n西湖十景\n\n灵隐寺\nhttps://b.example\n古刹"
        );
        assert_eq!(render_hits(&[]), "No results found.");
    }
}
