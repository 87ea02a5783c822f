//! Multi-turn conversation command.

use tourbot_conversation::ConversationManager;
use tracing::info;

use super::{build_conversation_config, init_common_components};

#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
    /// Session name
    pub session_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components(input.model)?;
        let conversation_config = build_conversation_config(&common.config, input.session_name);

        info!(
            "Starting conversation session: {} (name: {:?})",
            conversation_config.session_id, conversation_config.session_name
        );

        let mut manager = ConversationManager::new(common.assistants, conversation_config);

        if let Some(msg) = input.message {
            if let Some(welcome) = manager.start().await {
                println!("{welcome}\n");
            }
            println!("{}", manager.respond(&msg).await);
        } else {
            manager.run_interactive().await?;

            let session = manager.session();
            info!(
                "Conversation ended: {} total messages",
                session.message_count()
            );
        }

        Ok(())
    }
}
