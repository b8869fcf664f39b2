//! CLI commands and argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Infinite scroll pagination controller CLI
#[derive(Parser, Debug)]
#[command(name = "infinite-scroll")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pager config file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Page through a JSON REST endpoint
    Fetch(FetchArgs),

    /// Scroll a simulated viewport over an in-memory dataset
    Simulate(SimulateArgs),

    /// Validate the config file and print it with defaults applied
    Validate,
}

/// Arguments for `fetch`
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Endpoint URL
    #[arg(long)]
    pub url: String,

    /// Dot path to the item array in the response body
    #[arg(long, default_value = "results")]
    pub items_path: String,

    /// Dot path to the total count in the response body
    #[arg(long, default_value = "count")]
    pub total_path: String,

    /// The endpoint reports no total; stop on a short page
    #[arg(long)]
    pub no_total: bool,

    /// Query parameter carrying the offset
    #[arg(long, default_value = "offset")]
    pub offset_param: String,

    /// Query parameter carrying the page size
    #[arg(long, default_value = "limit")]
    pub limit_param: String,

    /// Query parameter carrying the page index, if the API wants one
    #[arg(long)]
    pub page_param: Option<String>,

    /// Request header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Items per page (overrides the config file)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Per-page timeout in milliseconds
    #[arg(long, default_value = "10000")]
    pub timeout_ms: u64,

    /// Maximum pages per second
    #[arg(long)]
    pub rps: Option<u32>,

    /// Explicit retries of a failed page before giving up
    #[arg(long, default_value = "2")]
    pub retries: u32,
}

/// Arguments for `simulate`
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Items in the simulated dataset
    #[arg(long, default_value = "100")]
    pub total: u64,

    /// Items per page (overrides the config file)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Fail every Nth page load
    #[arg(long)]
    pub fail_every: Option<u32>,

    /// Viewport height in pixels
    #[arg(long, default_value = "600")]
    pub viewport: f64,

    /// Row height in pixels
    #[arg(long, default_value = "40")]
    pub item_height: f64,

    /// Look-ahead bias in pixels (overrides the config file)
    #[arg(long)]
    pub bias: Option<f64>,

    /// Simulated latency per page in milliseconds
    #[arg(long, default_value = "0")]
    pub latency_ms: u64,

    /// Omit the total count from pages
    #[arg(long)]
    pub no_total: bool,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
