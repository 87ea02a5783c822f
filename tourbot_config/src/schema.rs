use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tourbot_core::GenerationSettings;
use tourbot_core::policy::{Policy, PolicyError};

// Import WebSearchConfig from tourbot_tools to avoid duplication
use tourbot_tools::WebSearchConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// The generation calls a turn can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Route,
    Chat,
    Sales,
    Welcome,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<AgentOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<AgentOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<AgentOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome: Option<AgentOverride>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentDefaults {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Per-agent values; anything unset falls back to `agents.defaults`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AgentOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl AgentsConfig {
    #[must_use]
    pub fn settings_for(&self, kind: AgentKind) -> GenerationSettings {
        let overrides = match kind {
            AgentKind::Route => self.route.as_ref(),
            AgentKind::Chat => self.chat.as_ref(),
            AgentKind::Sales => self.sales.as_ref(),
            AgentKind::Welcome => self.welcome.as_ref(),
        };
        let defaults = &self.defaults;
        GenerationSettings {
            model: overrides
                .and_then(|o| o.model.clone())
                .unwrap_or_else(|| defaults.model.clone()),
            temperature: overrides
                .and_then(|o| o.temperature)
                .unwrap_or(defaults.temperature),
            max_tokens: overrides
                .and_then(|o| o.max_tokens)
                .unwrap_or(defaults.max_tokens),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub openai: OpenAIConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily: Option<WebSearchConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    #[serde(default = "OpenAIConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "OpenAIConfig::default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Delays between transport retries; empty means a single attempt.
    #[serde(default)]
    pub retry_delays_secs: Vec<u64>,
}

impl OpenAIConfig {
    fn default_base_url() -> String {
        "https://api.openai.com/v1".to_string()
    }

    const fn default_max_tool_rounds() -> usize {
        5
    }

    #[must_use]
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KnowledgeConfig {
    #[serde(default = "KnowledgeConfig::default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "KnowledgeConfig::default_top_k")]
    pub top_k: usize,
    #[serde(default = "KnowledgeConfig::default_min_score")]
    pub min_score: f64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            catalog_path: Self::default_catalog_path(),
            top_k: Self::default_top_k(),
            min_score: Self::default_min_score(),
        }
    }
}

impl KnowledgeConfig {
    fn default_catalog_path() -> PathBuf {
        PathBuf::from("product_information/product.txt")
    }

    const fn default_top_k() -> usize {
        4
    }

    const fn default_min_score() -> f64 {
        0.05
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationSettings {
    /// Turns of history visible to each routing and responding call.
    #[serde(default = "ConversationSettings::default_window_size")]
    pub window_size: usize,
    /// Earlier user turns scanned for a recurring interest.
    #[serde(default = "ConversationSettings::default_lookback")]
    pub lookback_user_turns: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            window_size: Self::default_window_size(),
            lookback_user_turns: Self::default_lookback(),
        }
    }
}

impl ConversationSettings {
    const fn default_window_size() -> usize {
        4
    }

    const fn default_lookback() -> usize {
        2
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PolicyConfig {
    /// Replaces the built-in policy document when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl PolicyConfig {
    pub fn load(&self) -> Result<Policy, PolicyError> {
        self.path
            .as_deref()
            .map_or_else(Policy::builtin, Policy::from_path)
    }
}

const CONFIG_TEMPLATE: &str = r#"{
  "agents": {
    "defaults": {
      "model": "gpt-4o-mini",
      "max_tokens": 2048,
      "temperature": 0.6
    },
    "route": { "temperature": 0.6 },
    "chat": { "temperature": 0.6 },
    "sales": { "temperature": 0.3 },
    "welcome": { "temperature": 0.6 }
  },
  "providers": {
    "openai": {
      "api_key": "your-openai-api-key-here",
      "base_url": "https://api.openai.com/v1",
      "max_tool_rounds": 5,
      "retry_delays_secs": []
    },
    "tavily": {
      "api_key": "your-tavily-api-key-here",
      "max_results": 2,
      "timeout": 15
    }
  },
  "knowledge": {
    "catalog_path": "product_information/product.txt",
    "top_k": 4,
    "min_score": 0.05
  },
  "conversation": {
    "window_size": 4,
    "lookback_user_turns": 2
  },
  "policy": {}
}"#;

/// `~/tourbot/config.json`
pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

fn config_dir() -> anyhow::Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
        .join("tourbot"))
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'tourbot init' to create config.",
                config_path.display()
            );
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;

        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// The configured web search, if a key is present.
    #[must_use]
    pub fn web_search(&self) -> Option<&WebSearchConfig> {
        self.providers
            .tavily
            .as_ref()
            .filter(|t| !t.api_key.trim().is_empty())
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_path = Self::ensure_config_dir()?.join("config.json");
        Self::write_template(&config_path)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Edit the config file and add your OpenAI-compatible API key");
        println!("   2. Optionally add a Tavily API key for web search");
        println!("   3. Point knowledge.catalog_path at your product catalog");
        println!("   4. Run 'tourbot chat' to start a conversation");
        println!();
        println!("🔧 Configuration options:");
        println!("   - agents.<route|chat|sales|welcome>: per-call model and temperature");
        println!("   - conversation.window_size: number of turns each call sees");
        println!("   - policy.path: custom prompt templates and keyword lists");
        println!();
        Ok(())
    }

    /// Write the default template to `path`, refusing to overwrite.
    pub fn write_template(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                path.display()
            );
        }
        std::fs::write(path, CONFIG_TEMPLATE)?;
        Ok(())
    }
}
