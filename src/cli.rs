use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "A waitlist availability watcher")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch current state, diff against the last snapshot, notify and persist
    Watch(WatchArgs),

    /// Display stored snapshots
    Report(ReportArgs),

    /// Compare two stored snapshots
    Diff(DiffArgs),
}

#[derive(Parser)]
pub struct WatchArgs {
    /// Config file path (defaults to the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fetch and diff but skip notification, persistence, and watch-list pruning
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Output the delta as JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Per-request timeout in seconds (overrides the config file)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Show detailed output including diagnostics
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct ReportArgs {
    /// List all stored snapshots
    #[arg(long, default_value_t = false)]
    pub list: bool,

    /// Show a specific snapshot by ID (defaults to the most recent)
    #[arg(long)]
    pub id: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Starting snapshot ID for comparison
    #[arg(long)]
    pub from: Option<String>,

    /// Ending snapshot ID for comparison
    #[arg(long)]
    pub to: Option<String>,
}
