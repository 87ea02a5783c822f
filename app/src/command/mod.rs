//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use std::sync::Arc;

use anyhow::Context;
use tourbot_config::{AgentKind, Config};
use tourbot_conversation::{AssistantSettings, Assistants, ConversationConfig};
use tourbot_core::{Gazetteer, KnowledgeLookup, LLMProvider, Policy, ToolRegistry};
use tourbot_knowledge::KnowledgeBase;
use tourbot_providers::OpenAIProvider;
use tourbot_tools::{ProductSearchTool, WebSearchTool};
use tracing::{info, warn};

mod chat;
mod info;
mod init;
mod route;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use route::{RouteInput, RouteStrategy};
pub use version::VersionStrategy;

/// Contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Everything a conversation needs, wired from the config file.
pub struct CommonComponents {
    pub config: Config,
    pub assistants: Arc<Assistants>,
}

/// Load config, policy and catalog, then assemble the assistants.
pub fn init_common_components(model: Option<String>) -> anyhow::Result<CommonComponents> {
    let config = Config::load()?;
    info!("Loaded config from ~/tourbot/config.json");

    let policy = Arc::new(
        config
            .policy
            .load()
            .context("Failed to load policy document")?,
    );
    info!("Policy version {}", policy.version);

    let catalog_path = &config.knowledge.catalog_path;
    let knowledge = KnowledgeBase::from_path(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?
        .with_top_k(config.knowledge.top_k)
        .with_min_score(config.knowledge.min_score);

    let mut gazetteer = Gazetteer::from_policy(&policy);
    gazetteer.extend_with_catalog(knowledge.entries());
    info!(
        "Gazetteer has {} places, catalog has {} products",
        gazetteer.len(),
        knowledge.len()
    );

    let knowledge: Arc<dyn KnowledgeLookup> = Arc::new(knowledge);
    let route_tools = ToolRegistry::new().with_tool(Arc::new(ProductSearchTool::new(
        knowledge.clone(),
        policy.messages.no_products.clone(),
    )));

    let mut chat_tools = ToolRegistry::new();
    match config.web_search() {
        Some(search) => chat_tools.register(Arc::new(WebSearchTool::new(search.clone())?)),
        None => warn!("No Tavily API key configured, general answers run without web search"),
    }

    let openai = &config.providers.openai;
    let provider: Arc<dyn LLMProvider> = Arc::new(
        OpenAIProvider::new(openai.api_key.clone())
            .with_base_url(openai.base_url.clone())
            .with_max_tool_rounds(openai.max_tool_rounds)
            .with_retry_delays(openai.retry_delays()),
    );

    let settings = assistant_settings(&config, model);
    let assistants = Assistants::builder(provider, knowledge, policy, Arc::new(gazetteer))
        .route_tools(route_tools)
        .chat_tools(chat_tools)
        .settings(settings)
        .build();

    Ok(CommonComponents {
        config,
        assistants: Arc::new(assistants),
    })
}

fn assistant_settings(config: &Config, model: Option<String>) -> AssistantSettings {
    let agents = &config.agents;
    let mut settings = AssistantSettings {
        route: agents.settings_for(AgentKind::Route),
        chat: agents.settings_for(AgentKind::Chat),
        sales: agents.settings_for(AgentKind::Sales),
        welcome: agents.settings_for(AgentKind::Welcome),
        lookback: config.conversation.lookback_user_turns,
    };
    if let Some(model) = model {
        for s in [
            &mut settings.route,
            &mut settings.chat,
            &mut settings.sales,
            &mut settings.welcome,
        ] {
            s.model.clone_from(&model);
        }
    }
    settings
}

/// Build conversation configuration from the config file.
pub fn build_conversation_config(
    config: &Config,
    session_name: Option<String>,
) -> ConversationConfig {
    ConversationConfig {
        session_name,
        ..ConversationConfig::default()
    }
    .with_window_size(config.conversation.window_size)
}

/// Keep the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else if chars.is_empty() {
        "(not set)".to_string()
    } else {
        "***".to_string()
    }
}

