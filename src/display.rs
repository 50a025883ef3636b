//! Text formatting shared by the CLI and the dashboard.
//!
//! Date input parsing, relative due labels, short ids and the plain-text task table.

use chrono::{Duration, NaiveDate};

use crate::stats::{due_state, DueState};
use crate::store::ID_PREFIX;
use crate::task::Task;
use crate::view::{TaskView, ViewRow};

/// Parse a deadline typed by a user.
///
/// Supports:
/// - "today", "tomorrow"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD"
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return today.succ_opt(),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some(n) = rest.strip_suffix('d') {
            if let Ok(days) = n.trim().parse::<i64>() {
                return Duration::try_days(days).and_then(|d| today.checked_add_signed(d));
            }
        }
        if let Some(n) = rest.strip_suffix('w') {
            if let Ok(weeks) = n.trim().parse::<i64>() {
                return Duration::try_weeks(weeks).and_then(|d| today.checked_add_signed(d));
            }
        }
        return None;
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<NaiveDate>, today: NaiveDate) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d - today).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

/// Marker shown next to a due label.
pub fn due_marker(state: DueState) -> &'static str {
    match state {
        DueState::Overdue => "!",
        DueState::DueSoon => "*",
        DueState::Scheduled | DueState::Unscheduled | DueState::Done => "",
    }
}

/// Id without the `task:` prefix.
pub fn short_id(id: &str) -> &str {
    id.strip_prefix(ID_PREFIX).unwrap_or(id)
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

fn print_header(compact: bool) {
    if compact {
        println!("{:<12} {:<11} {:<6} {:<12} {:<14} {}", "ID", "Status", "Pri", "Due", "Assignee", "Description");
    } else {
        println!(
            "{:<12} {:<11} {:<6} {:<12} {:<14} {:<24} {}",
            "ID", "Status", "Pri", "Due", "Assignee", "Topic", "Description"
        );
    }
}

fn print_task_row(t: &Task, today: NaiveDate, due_soon_days: i64, compact: bool) {
    let due = format!(
        "{}{}",
        format_due_relative(t.deadline, today),
        due_marker(due_state(t, today, due_soon_days))
    );
    let id = short_id(&t.id);
    if compact {
        println!(
            "{:<12} {:<11} {:<6} {:<12} {:<14} {}",
            id,
            t.status.label(),
            t.priority.label(),
            due,
            truncate(t.assignee_label(), 14),
            t.description
        );
    } else {
        println!(
            "{:<12} {:<11} {:<6} {:<12} {:<14} {:<24} {}",
            id,
            t.status.label(),
            t.priority.label(),
            due,
            truncate(t.assignee_label(), 14),
            truncate(&t.primary_topic, 24),
            t.description
        );
        if let Some(ctx) = t.context.as_deref().filter(|c| !c.trim().is_empty()) {
            println!("{:<12} ↳ {}", "", truncate(ctx, 80));
        }
    }
}

/// Print a composed view as a table, with a header line per group when grouped.
pub fn print_view(view: &TaskView<'_>, today: NaiveDate, due_soon_days: i64) {
    print_header(view.compact);
    for row in view.rows() {
        match row {
            ViewRow::Header { label, count } => println!("\n== {label} ({count}) =="),
            ViewRow::Task(t) => print_task_row(t, today, due_soon_days, view.compact),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::date;

    #[test]
    fn date_input_forms() {
        let today = date("2024-12-10");
        assert_eq!(parse_date_input("today", today), Some(today));
        assert_eq!(parse_date_input(" Tomorrow ", today), Some(date("2024-12-11")));
        assert_eq!(parse_date_input("in 3d", today), Some(date("2024-12-13")));
        assert_eq!(parse_date_input("in 2w", today), Some(date("2024-12-24")));
        assert_eq!(parse_date_input("2025-01-31", today), Some(date("2025-01-31")));
        assert_eq!(parse_date_input("in a while", today), None);
        assert_eq!(parse_date_input("next week", today), None);
    }

    #[test]
    fn out_of_range_offsets_are_rejected() {
        let today = date("2024-12-10");
        assert_eq!(parse_date_input("in 100000000d", today), None);
        assert_eq!(parse_date_input("in 9223372036854775807w", today), None);
        assert_eq!(parse_date_input("in -100000000d", today), None);
        assert!(parse_date_input("in 1000000d", today).is_some());
    }

    #[test]
    fn relative_due_labels() {
        let today = date("2024-12-10");
        assert_eq!(format_due_relative(None, today), "-");
        assert_eq!(format_due_relative(Some(today), today), "today");
        assert_eq!(format_due_relative(Some(date("2024-12-11")), today), "tomorrow");
        assert_eq!(format_due_relative(Some(date("2024-12-15")), today), "in 5d");
        assert_eq!(format_due_relative(Some(date("2024-12-08")), today), "2d late");
    }

    #[test]
    fn ids_and_truncation() {
        assert_eq!(short_id("task:abc123def456"), "abc123def456");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer label", 6), "a lon…");
    }
}
