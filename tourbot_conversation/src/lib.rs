#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Multi-turn tourism conversations.
//!
//! A `ConversationManager` owns one session. Each user turn is routed to the
//! general or sales responder using a window over the turns that came
//! before it, and the answer is appended to the transcript.

mod assistants;
mod manager;
mod session;

pub use assistants::{AssistantSettings, Assistants, AssistantsBuilder};
pub use manager::{
    ConversationConfig, ConversationError, ConversationManager, TurnContext, TurnResult,
};
pub use session::ConversationSession;
