//! Command implementations for the CLI interface.
//!
//! Each handler works against a [`TaskApi`] and the loaded [`Config`], prints to
//! stdout on success and returns errors to `main`, which reports them and exits.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::config::Config;
use crate::display::*;
use crate::error::{Error, Result};
use crate::fields::*;
use crate::stats::compute_stats;
use crate::store::{import_consolidated, Pagination, TaskApi, TaskStore};
use crate::task::{NewTask, Task, TaskUpdate};
use crate::topic_tree::build_topic_tree;
use crate::view::{compose, ViewEvent, ViewState};

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the interactive dashboard.
    Ui {
        /// Initial filter as a URL query, e.g. "status=pending&topic=Work".
        #[arg(long)]
        query: Option<String>,
    },

    /// List tasks with optional filters, grouping and sorting.
    List {
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Topic prefix, e.g. "Work/Projects".
        #[arg(long)]
        topic: Option<String>,
        /// Assignee name, or "Unassigned".
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Case-insensitive text in description, topic or assignee.
        #[arg(long, short = 'q')]
        search: Option<String>,
        /// Filter as a URL query string. Explicit flags take precedence.
        #[arg(long)]
        query: Option<String>,
        #[arg(long, value_enum)]
        group: Option<GroupBy>,
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
        /// Maximum rows (defaults to page_size from config.json).
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Hide topic and context.
        #[arg(long)]
        compact: bool,
    },

    /// Show the topic tree with task counts.
    Tree {
        /// Only print the subtree under this topic path.
        #[arg(long)]
        topic: Option<String>,
    },

    /// Show dashboard statistics and assignee rollups.
    Stats {
        /// Print machine-readable JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Show a single task by id (with or without the "task:" prefix).
    Show { id: String },

    /// Add a new task.
    Add {
        description: String,
        #[arg(long)]
        assignee: Option<String>,
        /// Deadline: YYYY-MM-DD, "today", "tomorrow", "in Nd" or "in Nw".
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Slash-delimited primary topic (default "General").
        #[arg(long)]
        topic: Option<String>,
        /// Secondary topics. May be repeated and comma-separated.
        #[arg(long = "also")]
        also: Vec<String>,
        #[arg(long)]
        context: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Source transcript id.
        #[arg(long)]
        source_id: Option<String>,
        /// Source transcript title.
        #[arg(long)]
        source_title: Option<String>,
    },

    /// Update fields on a task.
    Update {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        clear_assignee: bool,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        topic: Option<String>,
        /// Replace secondary topics. May be repeated and comma-separated.
        #[arg(long = "also")]
        also: Vec<String>,
        #[arg(long)]
        clear_also: bool,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        clear_context: bool,
        #[arg(long, value_enum)]
        status: Option<Status>,
    },

    /// Mark a task completed.
    Complete { id: String },

    /// Reopen a task (status pending).
    Reopen { id: String },

    /// Delete a task.
    Delete { id: String },

    /// Append a note to a task.
    Note { id: String, text: String },

    /// Import tasks from a consolidated extraction file.
    Import {
        file: PathBuf,
        /// Report what would be imported without writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_due(s: &str) -> Result<NaiveDate> {
    parse_date_input(s, today()).ok_or_else(|| {
        Error::InvalidInput(format!(
            "unrecognised date '{s}'. Use YYYY-MM-DD, 'today', 'tomorrow', 'in Nd' or 'in Nw'"
        ))
    })
}

/// Split repeated, comma-separated topic arguments.
fn split_topics(inputs: &[String]) -> Vec<String> {
    inputs
        .iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `--x value` sets, `--clear-x` clears, neither leaves the field alone.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

/// Launch the dashboard TUI.
pub fn cmd_ui(store: TaskStore, config: &Config, query: Option<String>) -> Result<()> {
    let state = ViewState::new(config.default_group, config.default_sort)
        .with_query(query.as_deref().unwrap_or(""));
    crate::tui::run::run_dashboard(store, config, state)
}

/// List tasks through the filter, sort and group pipeline.
#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    api: &dyn TaskApi,
    config: &Config,
    status: Option<Status>,
    topic: Option<String>,
    assignee: Option<String>,
    priority: Option<Priority>,
    search: Option<String>,
    query: Option<String>,
    group: Option<GroupBy>,
    sort: Option<SortKey>,
    limit: Option<usize>,
    offset: usize,
    compact: bool,
) -> Result<()> {
    let mut state = ViewState::new(group.unwrap_or(config.default_group), config.default_sort)
        .with_query(query.as_deref().unwrap_or(""));
    // Explicit flags override the query string.
    if status.is_some() {
        state.apply(ViewEvent::SetStatus(status));
    }
    if priority.is_some() {
        state.apply(ViewEvent::SetPriority(priority));
    }
    if topic.is_some() {
        state.apply(ViewEvent::SetTopic(topic));
    }
    if assignee.is_some() {
        state.apply(ViewEvent::SetAssignee(assignee));
    }
    if search.is_some() {
        state.apply(ViewEvent::SetSearch(search));
    }
    if let Some(key) = sort {
        state.apply(ViewEvent::SetSort(key));
    }
    state.compact = compact;

    let window = Pagination { limit: limit.unwrap_or(config.page_size), offset };
    let page = api.list_tasks(&state.filter, window)?;
    if page.count == 0 {
        println!("No tasks found ({} match).", page.total);
        return Ok(());
    }

    // The page already passed the filter; compose re-checks it and adds sort and grouping.
    let view = compose(&page.tasks, &state, config.topic_match);
    print_view(&view, today(), config.due_soon_days);

    println!();
    println!("Showing {}-{} of {} task(s)", offset + 1, offset + page.count, page.total);
    if !state.filter.is_empty() {
        println!("Filter: ?{}", state.to_query());
    }
    Ok(())
}

/// Print the topic tree, or one subtree of it.
pub fn cmd_tree(api: &dyn TaskApi, topic: Option<String>) -> Result<()> {
    let tasks = api.snapshot()?;
    let root = build_topic_tree(&tasks);
    let (node, base) = match topic.as_deref() {
        Some(path) => {
            let node = root
                .find(path)
                .ok_or_else(|| Error::NotFound(format!("topic '{path}'")))?;
            println!("{} ({})", node.full_path, node.task_count);
            (node, 1)
        }
        None => (&root, 0),
    };
    if node.task_count == 0 {
        println!("No tasks.");
        return Ok(());
    }
    for line in node.flatten(|_| true) {
        let name = if line.node.name.is_empty() { "(blank)" } else { line.node.name.as_str() };
        println!("{}{} ({})", "  ".repeat(line.depth + base), name, line.node.task_count);
    }
    Ok(())
}

/// Print dashboard statistics.
pub fn cmd_stats(api: &dyn TaskApi, config: &Config, json: bool) -> Result<()> {
    let tasks = api.snapshot()?;
    let all: Vec<&Task> = tasks.iter().collect();
    let stats = compute_stats(&all, today(), config.stats_settings());

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let store_stats = api.get_stats()?;
    println!("Tasks:        {}", stats.total);
    for s in Status::ALL {
        println!("  {:<12}{}", s.label(), stats.status_count(s));
    }
    println!("Priority:     {}", Priority::ALL.iter().map(|p| format!("{} {}", p.label(), stats.priority_count(*p))).collect::<Vec<_>>().join(" | "));
    println!("Overdue:      {}", stats.overdue_count);
    println!("Due soon:     {} (next {} days)", stats.due_soon_count, config.due_soon_days);
    println!("Completion:   {}%", stats.completion_percent());
    println!("Topics:       {}", store_stats.topics.len());
    println!(
        "Last updated: {}",
        store_stats.last_updated.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
    );

    let today = today();
    if !stats.urgent_tasks.is_empty() {
        println!("\nUrgent:");
        for t in &stats.urgent_tasks {
            println!(
                "  {:<12} {:<6} {:<10} {}",
                short_id(&t.id),
                t.priority.label(),
                format_due_relative(t.deadline, today),
                t.description
            );
        }
    }
    if !stats.recent_tasks.is_empty() {
        println!("\nRecently updated:");
        for t in &stats.recent_tasks {
            println!("  {:<12} {:<11} {}", short_id(&t.id), t.status.label(), t.description);
        }
    }
    if !stats.assignee_rollups.is_empty() {
        println!("\n{:<20} {:>5} {:>5} {:>5} {:>5} {:>8} {:>9}", "Assignee", "Total", "High", "Med", "Low", "Pending", "Completed");
        for r in &stats.assignee_rollups {
            println!(
                "{:<20} {:>5} {:>5} {:>5} {:>5} {:>8} {:>9}",
                truncate(&r.name, 20),
                r.total,
                r.priority_count(Priority::High),
                r.priority_count(Priority::Medium),
                r.priority_count(Priority::Low),
                r.pending,
                r.completed
            );
        }
    }
    Ok(())
}

/// Show every field of one task.
pub fn cmd_show(api: &dyn TaskApi, id: &str) -> Result<()> {
    let task = api.get_task(id)?;
    let today = today();
    let or_dash = |v: Option<&str>| v.filter(|s| !s.is_empty()).unwrap_or("-").to_string();
    println!("ID:           {}", task.id);
    println!("Description:  {}", task.description);
    println!("Status:       {}", task.status.label());
    println!("Priority:     {}", task.priority.label());
    println!("Assignee:     {}", task.assignee_label());
    println!(
        "Deadline:     {}",
        match task.deadline {
            Some(d) => format!("{d} ({})", format_due_relative(Some(d), today)),
            None => "-".into(),
        }
    );
    println!("Topic:        {}", task.primary_topic);
    println!(
        "Also:         {}",
        if task.secondary_topics.is_empty() { "-".into() } else { task.secondary_topics.join(", ") }
    );
    println!("Context:      {}", or_dash(task.context.as_deref()));
    if let Some((id, title)) = task.provenance() {
        println!("Source:       {title} ({id})");
    }
    println!("Created:      {}", task.created_at.to_rfc3339());
    println!("Updated:      {}", task.updated_at.to_rfc3339());
    println!(
        "Completed:    {}",
        task.completed_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into())
    );
    if task.notes.is_empty() {
        println!("Notes:        -");
    } else {
        println!("Notes:");
        for note in &task.notes {
            println!("  [{}] {}", note.created_at.format("%Y-%m-%d %H:%M"), note.text);
        }
    }
    Ok(())
}

/// Create a task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    api: &mut dyn TaskApi,
    description: String,
    assignee: Option<String>,
    due: Option<String>,
    priority: Option<Priority>,
    topic: Option<String>,
    also: Vec<String>,
    context: Option<String>,
    status: Option<Status>,
    source_id: Option<String>,
    source_title: Option<String>,
) -> Result<()> {
    let deadline = due.as_deref().map(parse_due).transpose()?;
    let task = api.create_task(NewTask {
        description,
        assignee: assignee.filter(|a| !a.trim().is_empty()),
        deadline,
        priority,
        primary_topic: topic,
        secondary_topics: split_topics(&also),
        status,
        context,
        source_transcript_id: source_id,
        source_transcript_title: source_title,
    })?;
    println!("Added task {}", task.id);
    Ok(())
}

/// Update selected fields of a task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    api: &mut dyn TaskApi,
    id: &str,
    description: Option<String>,
    assignee: Option<String>,
    clear_assignee: bool,
    due: Option<String>,
    clear_due: bool,
    priority: Option<Priority>,
    topic: Option<String>,
    also: Vec<String>,
    clear_also: bool,
    context: Option<String>,
    clear_context: bool,
    status: Option<Status>,
) -> Result<()> {
    let deadline = due.as_deref().map(parse_due).transpose()?;
    let secondary_topics = if clear_also {
        Some(Vec::new())
    } else if also.is_empty() {
        None
    } else {
        Some(split_topics(&also))
    };
    let update = TaskUpdate {
        description,
        assignee: clearable(assignee, clear_assignee),
        deadline: clearable(deadline, clear_due),
        primary_topic: topic,
        secondary_topics,
        priority,
        context: clearable(context, clear_context),
        status,
    };
    if update.is_empty() {
        return Err(Error::InvalidInput("nothing to update".into()));
    }
    let task = api.update_task(id, update)?;
    println!("Updated task {}", task.id);
    Ok(())
}

pub fn cmd_complete(api: &mut dyn TaskApi, id: &str) -> Result<()> {
    let task = api.complete_task(id)?;
    println!("Completed {}", task.id);
    Ok(())
}

pub fn cmd_reopen(api: &mut dyn TaskApi, id: &str) -> Result<()> {
    let task = api.reopen_task(id)?;
    println!("Reopened {}", task.id);
    Ok(())
}

pub fn cmd_delete(api: &mut dyn TaskApi, id: &str) -> Result<()> {
    let ack = api.delete_task(id)?;
    println!("Deleted {}", ack.task_id);
    Ok(())
}

pub fn cmd_note(api: &mut dyn TaskApi, id: &str, text: &str) -> Result<()> {
    let task = api.add_note(id, text)?;
    println!("Added note to {} ({} total)", task.id, task.notes.len());
    Ok(())
}

/// Import a consolidated task file.
pub fn cmd_import(api: &mut dyn TaskApi, file: &Path, dry_run: bool) -> Result<()> {
    let report = import_consolidated(api, file, dry_run)?;
    for (id, description) in &report.imported {
        match id {
            Some(id) => println!("  {:<12} {}", short_id(id), description),
            None => println!("  would import: {description}"),
        }
    }
    if report.dry_run {
        println!("Dry run: {} task(s) would be imported, {} skipped.", report.imported.len(), report.skipped);
    } else {
        println!("Import completed. {} task(s) imported, {} skipped.", report.imported.len(), report.skipped);
    }
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
