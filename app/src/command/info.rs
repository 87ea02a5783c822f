use tourbot_config::{AgentKind, Config};
use tourbot_knowledge::KnowledgeBase;
use tracing::info;

use super::mask_secret;

/// Prints the effective configuration with masked keys, plus whether the
/// policy and catalog load.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== tourbot Configuration ===\n");

        println!("API Keys:");
        println!("  OpenAI: {}", mask_secret(&config.providers.openai.api_key));
        match &config.providers.tavily {
            Some(tavily) => println!("  Tavily: {}", mask_secret(&tavily.api_key)),
            None => println!("  Tavily: (not set)"),
        }
        println!();

        println!("Provider:");
        println!("  Base URL: {}", config.providers.openai.base_url);
        println!(
            "  Max Tool Rounds: {}",
            config.providers.openai.max_tool_rounds
        );
        println!(
            "  Retry Delays: {:?}",
            config.providers.openai.retry_delays_secs
        );
        println!();

        println!("Agents:");
        for (label, kind) in [
            ("route", AgentKind::Route),
            ("chat", AgentKind::Chat),
            ("sales", AgentKind::Sales),
            ("welcome", AgentKind::Welcome),
        ] {
            let s = config.agents.settings_for(kind);
            println!(
                "  {label:<8} model={} temperature={} max_tokens={}",
                s.model, s.temperature, s.max_tokens
            );
        }
        println!();

        println!("Conversation:");
        println!("  Window Size: {}", config.conversation.window_size);
        println!(
            "  Lookback User Turns: {}",
            config.conversation.lookback_user_turns
        );
        println!();

        println!("Policy:");
        match config.policy.load() {
            Ok(policy) => {
                let source = config
                    .policy
                    .path
                    .as_ref()
                    .map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
                println!("  Source: {source}");
                println!("  Version: {}", policy.version);
                println!("  Keywords: {}", policy.keywords.len());
                println!("  Places: {}", policy.places.len());
            }
            Err(e) => {
                println!("  Status: Failed to load");
                println!("  Error: {e}");
            }
        }
        println!();

        println!("Catalog:");
        let path = &config.knowledge.catalog_path;
        println!("  Path: {}", path.display());
        info!("Loading catalog from {}", path.display());
        match KnowledgeBase::from_path(path) {
            Ok(kb) => println!("  Status: {} products", kb.len()),
            Err(e) => {
                println!("  Status: Failed to load");
                println!("  Error: {e}");
            }
        }
        println!(
            "  Top K: {}, Min Score: {}",
            config.knowledge.top_k, config.knowledge.min_score
        );

        Ok(())
    }
}
