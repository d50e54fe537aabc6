//! # docqa CLI
//!
//! ```bash
//! docqa [--config ./docqa.toml] <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa ingest` | Split, embed, and store the configured document |
//! | `docqa serve` | Start the RAG answer HTTP server |
//! | `docqa ask "<question>"` | Answer one question from the store |
//! | `docqa chat` | Interactive terminal chat with the chat model |
//! | `docqa stats` | Summarize the vector store |
//!
//! API keys are read from the environment, after loading `.env` from the
//! working directory if present. Logs go to stderr; set `RUST_LOG=debug`
//! for detail.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::{ask, chat, config, credentials, ingest, server, stats};

/// docqa: question answering over your documents.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Document question answering: ingestion, a RAG answer server, and a terminal chat",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// Defaults to `./docqa.toml` when it exists; otherwise built-in
    /// defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the configured document into the vector store.
    ///
    /// Extracts text (PDF pages or plain text), splits it into overlapping
    /// chunks, embeds every chunk, and writes all records in one
    /// transaction.
    Ingest,

    /// Start the HTTP server exposing `GET /` and `POST /ask`.
    Serve,

    /// Answer a single question and print the result.
    Ask {
        /// The question to answer.
        question: String,

        /// Also list the retrieved chunks.
        #[arg(long)]
        sources: bool,
    },

    /// Chat with the configured chat model in the terminal.
    Chat,

    /// Show what the vector store contains.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    credentials::load_dotenv();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ingest => {
            ingest::run_ingest(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ask { question, sources } => {
            ask::run_ask(&cfg, &question, sources).await?;
        }
        Commands::Chat => {
            chat::run_chat(&cfg).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
