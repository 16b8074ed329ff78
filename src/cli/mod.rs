//! CLI command definitions and parsing
use crate::retrieval::SearchMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ragserve",
    version,
    about = "Document retrieval over a remote vector store",
    long_about = "Ragserve answers free-text and file-name queries against an external vector \
                  database collection: dense, keyword (BM25) and hybrid search over stored \
                  document chunks, plus whole-document reassembly in page order."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/ragserve/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the distinct file names stored in the collection
    Files,

    /// Fetch every page of documents matching a file name or pattern
    Pages {
        /// File name or `*` glob pattern; a bare name matches as a substring
        name: String,
    },

    /// Search the collection
    Search {
        /// Search query text
        query: String,

        /// Search mode
        #[arg(short, long, value_parser = ["dense", "bm25", "hybrid"], default_value = "hybrid")]
        mode: String,

        /// Maximum number of results to return
        #[arg(short, long, default_value = "4")]
        limit: usize,

        /// Keyword/vector fusion weight in [0,1] (0 = pure keyword, 1 = pure vector)
        #[arg(short, long, default_value = "0.5")]
        alpha: f32,

        /// Restrict results to file names matching this `*` glob pattern
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Initialize a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Map the parsed mode string (plus an optional file pattern) to a search mode
pub fn resolve_mode(mode: &str, file: Option<&str>) -> SearchMode {
    match (mode, file) {
        ("dense", _) => SearchMode::Dense,
        ("bm25", _) => SearchMode::Bm25,
        (_, Some(_)) => SearchMode::HybridFiltered,
        _ => SearchMode::Hybrid,
    }
}
