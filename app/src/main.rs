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

mod command;

use clap::{Parser, Subcommand};
use command::{
    ChatInput, ChatStrategy, CommandStrategy, InfoStrategy, InitStrategy, RouteInput,
    RouteStrategy, VersionStrategy,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "tourbot")]
#[command(about = "Tourism Q&A and product recommendation chatbot", long_about = None)]
struct Cli {
    /// Log routing decisions at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively, or answer a single message
    Chat {
        /// Single message to send
        #[arg(short = 'm', long)]
        message: Option<String>,

        /// Model to use for every call
        #[arg(short = 'M', long)]
        model: Option<String>,

        /// Session name
        #[arg(short = 'n', long)]
        name: Option<String>,
    },
    /// Show how a message would be routed without answering it
    Route {
        /// Message to route
        #[arg(short = 'm', long)]
        message: String,

        /// Earlier turns, alternating user and assistant, oldest first
        #[arg(long, num_args = 1..)]
        history: Vec<String>,
    },
    /// Initialize configuration
    Init,
    /// Show configuration and catalog status
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Chat {
            message,
            model,
            name,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    message,
                    model,
                    session_name: name,
                })
                .await
        }
        Commands::Route { message, history } => {
            RouteStrategy
                .execute(RouteInput { message, history })
                .await
        }
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
