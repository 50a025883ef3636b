//! # Taskboard - task dashboard for transcript-extracted work
//!
//! A terminal dashboard and CLI over tasks pulled out of meeting transcripts. Tasks
//! carry a slash-delimited primary topic ("Work/Projects/Alpha"), an optional
//! assignee and deadline, a priority and a status.
//!
//! ## Key Features
//!
//! - **Topic Tree**: topics roll up into a hierarchy with per-node task counts
//! - **Filter, Sort, Group**: five independent filters, five sort keys and one
//!   active grouping, composed in that order
//! - **Urgency Stats**: overdue and due-soon counts, urgent and recent lists,
//!   per-assignee rollups and completion rate
//! - **Query Mirroring**: the filter state round-trips through a URL query string,
//!   so `tb list --query` and `tb ui --query` share links with the dashboard
//! - **Local File Storage**: one JSON document, written atomically
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! tb add "Send revised budget" --topic Work/Finance --assignee Ana --due "in 3d" --priority high
//!
//! # Import everything from an extraction run
//! tb import consolidated_tasks.json --dry-run
//!
//! # List pending work grouped by topic
//! tb list --status pending --group topic
//!
//! # Open the dashboard with a filter preset
//! tb ui --query "assignee=Ana&priority=high"
//! ```
//!
//! Data lives in `~/.taskboard/` (override with `--dir` or `TASKBOARD_DIR`);
//! settings are read from `config.json` in the same directory.

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod display;
pub mod error;
pub mod fields;
pub mod filter;
pub mod group;
pub mod logging;
pub mod sort;
pub mod stats;
pub mod store;
pub mod task;
pub mod topic_tree;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
}

use cli::Cli;
use cmd::*;
use config::{resolve_data_dir, resolve_db_path, Config, CONFIG_FILE};
use error::Result;
use store::TaskStore;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return Ok(());
    }

    let data_dir = resolve_data_dir(cli.dir.as_deref())?;
    // The dashboard owns the terminal, so it logs to a file instead.
    match cli.command {
        Commands::Ui { .. } => logging::init_file(&data_dir)?,
        _ => logging::init_stderr(),
    }

    let config = Config::load_or_default(&data_dir.join(CONFIG_FILE));
    let db_path = resolve_db_path(cli.db.as_deref(), &data_dir);
    let mut store = TaskStore::open(&db_path, config.topic_match)?;

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),

        Commands::Ui { query } => cmd_ui(store, &config, query),

        Commands::List {
            status, topic, assignee, priority, search, query, group, sort, limit, offset, compact,
        } => cmd_list(
            &store, &config, status, topic, assignee, priority, search, query, group, sort, limit, offset, compact,
        ),

        Commands::Tree { topic } => cmd_tree(&store, topic),

        Commands::Stats { json } => cmd_stats(&store, &config, json),

        Commands::Show { id } => cmd_show(&store, &id),

        Commands::Add {
            description, assignee, due, priority, topic, also, context, status, source_id, source_title,
        } => cmd_add(
            &mut store, description, assignee, due, priority, topic, also, context, status, source_id, source_title,
        ),

        Commands::Update {
            id, description, assignee, clear_assignee, due, clear_due, priority, topic, also, clear_also,
            context, clear_context, status,
        } => cmd_update(
            &mut store, &id, description, assignee, clear_assignee, due, clear_due, priority, topic, also,
            clear_also, context, clear_context, status,
        ),

        Commands::Complete { id } => cmd_complete(&mut store, &id),

        Commands::Reopen { id } => cmd_reopen(&mut store, &id),

        Commands::Delete { id } => cmd_delete(&mut store, &id),

        Commands::Note { id, text } => cmd_note(&mut store, &id, &text),

        Commands::Import { file, dry_run } => cmd_import(&mut store, &file, dry_run),
    }
}
