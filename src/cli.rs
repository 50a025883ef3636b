use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Terminal dashboard for tasks extracted from meeting transcripts.
/// Storage defaults to $TASKBOARD_DIR/tasks.json (or ~/.taskboard/tasks.json).
#[derive(Parser)]
#[command(name = "tb", version, about = "Task dashboard with topic trees, grouping and urgency stats")]
pub struct Cli {
    /// Path to the JSON task file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Data directory holding tasks.json, config.json and logs.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
