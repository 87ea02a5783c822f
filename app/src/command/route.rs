//! Prints the routing decision for a message without answering it.

use tourbot_conversation::{ConversationManager, ConversationSession};
use tourbot_core::Role;

use super::{build_conversation_config, init_common_components};

#[derive(Debug, Clone)]
pub struct RouteInput {
    pub message: String,
    /// Earlier turns, alternating user and assistant, oldest first
    pub history: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteStrategy;

impl super::CommandStrategy for RouteStrategy {
    type Input = RouteInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let common = init_common_components(None)?;
        let config = build_conversation_config(&common.config, None);

        let mut session = ConversationSession::with_id(config.session_id);
        for (i, turn) in input.history.into_iter().enumerate() {
            let role = if i % 2 == 0 {
                Role::User
            } else {
                Role::Assistant
            };
            session.add_message(role, turn);
        }

        let manager = ConversationManager::new(common.assistants, config).with_session(session);
        let outcome = manager.preview_route(&input.message).await?;

        println!("Topic:     {}", outcome.topic);
        println!("Reason:    {:?}", outcome.report.reason);
        if let Some(raw) = &outcome.report.raw {
            println!("Raw:       {raw:?}");
        }
        for entry in &outcome.report.candidates {
            println!("Candidate: {} ({})", entry.name, entry.price);
        }
        println!("Decision:  {}", outcome.decision);

        Ok(())
    }
}
