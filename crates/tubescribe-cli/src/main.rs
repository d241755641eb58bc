use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tubescribe_core::action::AiAction;

mod commands;

#[derive(Parser)]
#[command(name = "tubescribe")]
#[command(
    about = "tubescribe - transcript extraction and AI actions for video pages",
    long_about = None
)]
struct Cli {
    /// Config file (default: ~/.config/tubescribe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the captured log history when the command finishes
    #[arg(long, global = true)]
    log_history: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the API key (an empty key removes it)
    SetKey { key: String },
    /// Check an API key against the provider
    Validate {
        /// Key to check instead of the stored one
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Open a watch page with a transcript fixture and run an AI action on it
    Run {
        /// Watch page URL
        #[arg(long)]
        url: String,
        /// JSON file with `[{"time": "0:00", "text": "..."}]` segments
        #[arg(long)]
        transcript: PathBuf,
        /// summarize, explain, quiz, notes or chat
        #[arg(long, default_value = "summarize")]
        action: AiAction,
        /// Question for the chat action
        #[arg(long)]
        question: Option<String>,
        /// Model override
        #[arg(long)]
        model: Option<String>,
        /// Write the chat history to this file (or into this directory)
        #[arg(long)]
        export_chat: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = commands::Context::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::SetKey { key } => commands::set_key::run(&context, &key).await,
        Commands::Validate { api_key } => commands::validate::run(&context, api_key).await,
        Commands::Run {
            url,
            transcript,
            action,
            question,
            model,
            export_chat,
        } => {
            commands::run::run(
                &context,
                commands::run::RunArgs {
                    url,
                    transcript,
                    action,
                    question,
                    model,
                    export_chat,
                },
            )
            .await
        }
    };

    if cli.log_history {
        commands::print_log_history(&context.history);
    }
    result
}
