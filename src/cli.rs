use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::Resolution;

/// Command line front-end for debugging the catalog client
#[derive(Debug, Parser)]
#[command(name = "betaflix")]
#[command(about = "Query the anime catalog API and print normalized JSON", long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the upstream base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Do not read or write the response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Ignore cached responses (fresh ones are still stored)
    #[arg(long, global = true)]
    pub refresh: bool,

    /// sqlx database URL for the response cache
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Latest releases
    Latest {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Recommended catalogue page
    Recommended {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Multi-episode titles from a latest page
    Series {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Movies; `--view` combines several upstream pages into one view
    Movies {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(long, conflicts_with = "page")]
        view: Option<u32>,
        /// Only keep titles containing this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Series catalogue: one deduplicated recommended page, or a series-only search
    Catalog {
        #[arg(short, long, default_value_t = 1, conflicts_with = "query")]
        page: u32,
        /// Search series by title instead of paging
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Search by title
    Search {
        query: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Detail and episode list for a title slug
    Detail { slug: String },
    /// Resolve a playable stream for an episode slug
    Video {
        chapter: String,
        #[arg(short, long, default_value_t = Resolution::P480)]
        resolution: Resolution,
    },
    /// Landing page rows
    Home {
        /// Seed for the recommendation shuffle
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Remove cached responses
    CacheClear {
        /// Only keys starting with this prefix, e.g. `search|`
        #[arg(long)]
        prefix: Option<String>,
    },
}
