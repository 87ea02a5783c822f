//! Conversation manager for multi-turn dialogue.
//!
//! The `ConversationManager` routes each user turn, dispatches it to the
//! chosen responder and records both turns in its session.

use crate::assistants::Assistants;
use crate::session::ConversationSession;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tourbot_core::agent::DEFAULT_WELCOME_STYLE;
use tourbot_core::{Role, RouteOutcome};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Session identifier
    pub session_id: Uuid,
    /// Optional session name
    pub session_name: Option<String>,
    /// Turns of history each routing and responding call sees
    pub window_size: usize,
    /// Style hint for the opening message
    pub welcome_style: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            session_id: Uuid::now_v7(),
            session_name: None,
            window_size: 4,
            welcome_style: DEFAULT_WELCOME_STYLE.to_string(),
        }
    }
}

impl ConversationConfig {
    #[must_use]
    pub const fn with_session_id(mut self, id: Uuid) -> Self {
        self.session_id = id;
        self
    }

    #[must_use]
    pub const fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    #[must_use]
    pub fn with_welcome_style(mut self, style: String) -> Self {
        self.welcome_style = style;
        self
    }
}

/// Errors that can occur during a conversation turn.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Text generation failed: {0}")]
    Generation(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty response from responder")]
    EmptyResponse,
}

/// Input for a single conversation turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub user_input: String,
    /// Caller-assigned turn number. Derived from the session when unset.
    pub turn_number: Option<usize>,
}

impl TurnContext {
    #[must_use]
    pub const fn new(user_input: String) -> Self {
        Self {
            user_input,
            turn_number: None,
        }
    }

    #[must_use]
    pub const fn with_turn_number(mut self, turn: usize) -> Self {
        self.turn_number = Some(turn);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TurnResult {
    pub response: String,
    /// How the turn was routed
    pub route: RouteOutcome,
    pub turn_number: usize,
}

/// Multi-turn conversation manager. Owns exactly one session.
pub struct ConversationManager {
    assistants: Arc<Assistants>,
    config: ConversationConfig,
    current_session: ConversationSession,
}

impl ConversationManager {
    #[must_use]
    pub fn new(assistants: Arc<Assistants>, config: ConversationConfig) -> Self {
        info!(
            "Creating conversation manager for session: {}",
            config.session_id
        );
        let mut current_session = ConversationSession::with_id(config.session_id);
        if let Some(name) = config.session_name.clone() {
            current_session = current_session.with_name(name);
        }

        Self {
            assistants,
            config,
            current_session,
        }
    }

    /// Continue an existing transcript instead of starting fresh.
    #[must_use]
    pub fn with_session(mut self, session: ConversationSession) -> Self {
        self.current_session = session;
        self
    }

    /// Record the opening message of a fresh session and return it.
    /// Returns `None` when the session already has turns.
    pub async fn start(&mut self) -> Option<String> {
        if !self.current_session.is_empty() {
            debug!("Session already started, skipping welcome");
            return None;
        }

        let welcome = match self
            .assistants
            .welcome
            .generate(&self.config.welcome_style)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Welcome generation failed: {e}, using fallback greeting");
                self.assistants.welcome.fallback().to_string()
            }
        };

        self.current_session
            .add_message(Role::Assistant, welcome.clone());
        Some(welcome)
    }

    /// Route the input against the current window without recording it.
    pub async fn preview_route(&self, input: &str) -> Result<RouteOutcome, ConversationError> {
        let window = self.current_session.window(self.config.window_size);
        Ok(self.assistants.router.route(&window, input).await?)
    }

    /// Process a single conversation turn.
    ///
    /// The window is taken before the user turn is appended. On failure the
    /// user turn stays in the transcript and no assistant turn is recorded.
    pub async fn process_turn(
        &mut self,
        context: TurnContext,
    ) -> Result<TurnResult, ConversationError> {
        let turn_number = context
            .turn_number
            .unwrap_or_else(|| self.current_session.user_turn_count() + 1);
        info!(
            "Processing turn {turn_number} for session: {}",
            self.config.session_id
        );

        let window = self.current_session.window(self.config.window_size);
        let input = context.user_input;
        self.current_session.add_message(Role::User, input.clone());

        let route = self.assistants.router.route(&window, &input).await?;
        let response = self
            .assistants
            .responder(route.decision)
            .respond(&window, &input)
            .await?;

        let response = response.trim();
        if response.is_empty() {
            return Err(ConversationError::EmptyResponse);
        }

        self.current_session
            .add_message(Role::Assistant, response.to_string());

        debug!("Turn {turn_number} completed via {}", route.decision);

        Ok(TurnResult {
            response: response.to_string(),
            route,
            turn_number,
        })
    }

    /// Process a turn, turning any failure into the policy's failure message.
    pub async fn respond(&mut self, input: &str) -> String {
        match self.process_turn(TurnContext::new(input.to_string())).await {
            Ok(result) => result.response,
            Err(e) => {
                warn!("Turn failed: {e}");
                self.assistants.policy.messages.failure.clone()
            }
        }
    }

    /// Run an interactive conversation loop on stdin/stdout.
    pub async fn run_interactive(&mut self) -> Result<(), ConversationError> {
        println!("=== Conversation Session: {} ===", self.config.session_id);
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

        if let Some(welcome) = self.start().await {
            println!("{welcome}\n");
        }

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut input = String::new();
            if std::io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();

            if matches!(input, "exit" | "quit" | "q") {
                println!(
                    "\nSession ended. Total turns: {}",
                    self.current_session.user_turn_count()
                );
                break;
            }

            if input.is_empty() {
                continue;
            }

            let response = self.respond(input).await;
            println!("\n{response}\n");
        }

        Ok(())
    }

    #[must_use]
    pub const fn session(&self) -> &ConversationSession {
        &self.current_session
    }

    #[must_use]
    pub const fn config(&self) -> &ConversationConfig {
        &self.config
    }
}
