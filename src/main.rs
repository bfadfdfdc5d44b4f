use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vekta_rag::commands;
use vekta_rag::config::{self, Settings};
use vekta_rag::RetrievalPipeline;

#[derive(Parser)]
#[command(name = "vekta-rag")]
#[command(version = "0.1")]
#[command(about = "Nearest-document retrieval over a persisted vector index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest JSON lines of {"text": ..., "vector": [...]} from stdin
    Ingest,
    /// Find the single nearest document for a {"vector": [...]} line on stdin
    Query,
    /// Like query, but return the top-k documents
    Search {
        #[arg(long)]
        top_k: Option<usize>,
    },
    List,
    Config,
}

fn init_tracing() {
    let default_level = if config::verbose_enabled() {
        "vekta_rag=debug"
    } else {
        "vekta_rag=info"
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("VEKTA_LOG").unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn open(settings: &Settings) -> Result<RetrievalPipeline> {
    RetrievalPipeline::open(settings)
        .with_context(|| format!("Failed to open snapshot '{}'", settings.path.display()))
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing();
    let settings = Settings::new()?;

    let stdin = io::stdin();
    let mut out = io::stdout().lock();

    match args.command {
        Commands::Ingest => commands::ingest(&open(&settings)?, stdin.lock(), &mut out)?,
        Commands::Query => commands::query(&open(&settings)?, &settings, stdin.lock(), &mut out)?,
        Commands::Search { top_k } => {
            commands::search(&open(&settings)?, &settings, top_k, stdin.lock(), &mut out)?
        }
        Commands::List => commands::list(&open(&settings)?, &mut out)?,
        Commands::Config => settings.print_config(),
    }
    Ok(())
}
