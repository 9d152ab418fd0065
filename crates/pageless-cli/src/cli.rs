use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pageless")]
#[command(about = "Simulate page-less loading of a huge fixed-height list", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Loader config file (or set PAGELESS_CONFIG env var)
    #[arg(long, value_name = "FILE", env = "PAGELESS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mount a loader over an in-memory dataset and scroll through it
    Simulate(SimulateArgs),
    /// Show the fills a fresh list would plan at each scroll position
    Plan(PlanArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Geometry shared by every command; unset values come from the config file.
#[derive(Args, Clone)]
pub struct GeometryArgs {
    /// Total number of items
    #[arg(long)]
    pub count: usize,
    /// Pixel height of one item
    #[arg(long)]
    pub item_size: Option<f64>,
    /// Pixel height of the scroll container
    #[arg(long, default_value_t = 400.0)]
    pub viewport_height: f64,
    /// Pixels above the viewport still treated as visible
    #[arg(long)]
    pub margin: Option<f64>,
    /// Scroll positions to visit, in order
    #[arg(long = "scroll", value_name = "PX")]
    pub scrolls: Vec<f64>,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,
    /// Delay before a scheduled load fires
    #[arg(long)]
    pub debounce_ms: Option<u64>,
    /// Fetch over HTTP from this base URL instead of the in-memory dataset
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,
    /// Simulated fetch latency of the in-memory dataset
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,
    /// Item markup of the in-memory dataset, `{index}` is replaced by the item index
    #[arg(long)]
    pub template: Option<String>,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,
}
