//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod caching;
mod helpers;
mod process;
mod query;
mod transfer;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "sent")]
#[command(about = "Web-crawl sentiment analysis pipeline and query engine")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Move crawl archives into raw articles and the process queue
    Transfer {
        /// Consume the crawl queue and read archive files
        #[arg(long)]
        files: bool,
        /// Enqueue raw articles that never produced a result
        #[arg(long)]
        documents: bool,
    },

    /// Seed crawl files from an exported key manifest
    TransferKeys {
        /// SQLite file holding a `keys` table
        #[arg(long)]
        file: std::path::PathBuf,
        /// Bucket prefix; becomes the crawl source key
        #[arg(long)]
        prefix: String,
        /// Archive kind: SQL, Text or ARFF
        #[arg(long, default_value = "SQL")]
        kind: String,
    },

    /// Consume the process queue and enrich articles
    Process {
        /// Number of concurrent workers
        #[arg(long, default_value = "1")]
        multi: usize,
    },

    /// Consume the query queue, or answer one query interactively
    Query {
        /// Read a single query from stdin and print the result
        #[arg(long)]
        cli: bool,
    },

    /// Re-enqueue every unprocessed raw article
    Reprocess,

    /// Warm the keyword cache from the store
    CacheKeywords,

    /// Warm the domain cache from the store
    CacheDomains,
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Transfer { files, documents } => {
            transfer::cmd_transfer(&settings, files, documents).await
        }
        Commands::TransferKeys { file, prefix, kind } => {
            transfer::cmd_transfer_keys(&settings, &file, &prefix, &kind).await
        }
        Commands::Process { multi } => process::cmd_process(&settings, multi).await,
        Commands::Query { cli } => {
            if cli {
                query::cmd_query_interactive(&settings).await
            } else {
                query::cmd_query_queue(&settings).await
            }
        }
        Commands::Reprocess => process::cmd_reprocess(&settings).await,
        Commands::CacheKeywords => caching::cmd_cache_keywords(&settings).await,
        Commands::CacheDomains => caching::cmd_cache_domains(&settings).await,
    }
}
