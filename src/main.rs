//! # Dropbox RAG CLI (`rag`)
//!
//! Builds the in-memory index from the configured Dropbox folder and queries
//! it from the command line.
//!
//! ## Usage
//!
//! ```bash
//! rag --config ./config/rag.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag build` | Walk, chunk and embed the corpus; print counts |
//! | `rag search "<query>"` | Build on demand, then print the top-k chunks |
//! | `rag stats` | Build on demand, then print index statistics as JSON |
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;

use dropbox_rag::config;
use dropbox_rag::index::IndexManager;

/// Dropbox RAG: retrieve relevant passages from a Dropbox folder.
#[derive(Parser)]
#[command(name = "rag", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./config/rag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index once and report what was loaded.
    Build,

    /// Search the corpus.
    Search {
        /// Query text.
        query: String,

        /// Number of chunks to return (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Print index statistics.
    Stats,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_or_default(&cli.config)?;
    let manager = IndexManager::from_config(&cfg)?;

    match cli.command {
        Commands::Build => {
            let started = Instant::now();
            manager.ensure_built().await?;
            let stats = manager.stats().await;
            println!(
                "Indexed {} documents ({} chunks, {} bytes) in {:.1}s",
                stats.documents,
                stats.chunks,
                stats.total_bytes,
                started.elapsed().as_secs_f64()
            );
        }
        Commands::Search { query, k } => {
            let k = k.unwrap_or(cfg.retrieval.top_k);
            let results = manager.retrieve(&query, k).await?;
            if results.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in results.iter().enumerate() {
                let snippet: String = hit.text.chars().take(200).collect();
                println!("{}. [{:.3}] {}", rank + 1, hit.score, hit.title);
                println!("    path: {}", hit.path);
                println!("    {}", snippet.replace('\n', " "));
                println!();
            }
        }
        Commands::Stats => {
            manager.ensure_built().await?;
            let stats = manager.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
