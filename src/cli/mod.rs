use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::chat::ChatModel;

pub mod chat;
pub mod summarize;
pub mod tokens;

#[derive(Subcommand)]
enum Command {
    /// Summarize text from a file or stdin
    Summarize {
        /// Read the text from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,

        /// Ask for a summary shorter than this many words
        #[arg(long)]
        words_limit: Option<usize>,

        #[arg(long, default_value = "0.7")]
        temperature: f32,

        /// Model to start with, overrides RECAP_MODEL
        #[arg(long)]
        model: Option<ChatModel>,

        /// Switch to a model with a larger context if the text needs it
        #[arg(long, action, default_value = "false")]
        allow_model_upgrade: bool,

        /// Only summarize the first chunk of long texts
        #[arg(long, action, default_value = "false")]
        no_recursion: bool,
    },
    /// Start a chat session
    Chat {
        #[arg(long)]
        model: Option<ChatModel>,
    },
    /// Count the tokens in text from a file or stdin
    Tokens {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

/// Logs go to stderr so that output on stdout can be piped.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    // Handle each sub command
    match args.command {
        Some(Command::Summarize {
            file,
            words_limit,
            temperature,
            model,
            allow_model_upgrade,
            no_recursion,
        }) => {
            let opts = summarize::SummarizeArgs {
                file,
                words_limit,
                temperature,
                model,
                allow_model_upgrade,
                allow_recursion: !no_recursion,
            };
            summarize::run(opts).await?;
        }
        Some(Command::Chat { model }) => {
            chat::run(model).await?;
        }
        Some(Command::Tokens { file }) => {
            tokens::run(file.as_deref())?;
        }
        None => {}
    }

    Ok(())
}
