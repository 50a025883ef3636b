//! Dashboard statistics derived from a task collection.
//!
//! Everything here is a pure function of the tasks and a caller-supplied "today",
//! so the same snapshot always yields the same numbers.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::fields::*;
use crate::sort::sort_tasks;
use crate::task::{Task, UNASSIGNED};

/// Window and list sizes used by [`compute_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSettings {
    pub due_soon_days: i64,
    pub urgent_limit: usize,
    pub recent_limit: usize,
}

impl Default for StatsSettings {
    fn default() -> Self {
        StatsSettings { due_soon_days: 7, urgent_limit: 5, recent_limit: 5 }
    }
}

/// Where an open task stands relative to its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    /// Deadline strictly before today.
    Overdue,
    /// Deadline between today and today + window, inclusive.
    DueSoon,
    /// Deadline past the due-soon window.
    Scheduled,
    Unscheduled,
    /// Completed tasks are never overdue or due soon.
    Done,
}

pub fn due_state(task: &Task, today: NaiveDate, due_soon_days: i64) -> DueState {
    if task.is_completed() {
        return DueState::Done;
    }
    // A window past the calendar's end covers every future deadline.
    let horizon = Duration::try_days(due_soon_days).and_then(|w| today.checked_add_signed(w));
    match task.deadline {
        None => DueState::Unscheduled,
        Some(d) if d < today => DueState::Overdue,
        Some(d) if horizon.map_or(true, |h| d <= h) => DueState::DueSoon,
        Some(_) => DueState::Scheduled,
    }
}

/// Per-assignee summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeRollup {
    /// Assignee name, with a missing assignee folded to "Unassigned".
    pub name: String,
    pub total: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    /// Tasks not yet completed (pending or in progress).
    pub pending: usize,
    pub completed: usize,
    #[serde(skip)]
    unassigned: bool,
}

impl AssigneeRollup {
    fn new(name: &str, unassigned: bool) -> Self {
        AssigneeRollup {
            name: name.to_string(),
            total: 0,
            by_priority: BTreeMap::new(),
            pending: 0,
            completed: 0,
            unassigned,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.unassigned
    }

    pub fn priority_count(&self, p: Priority) -> usize {
        self.by_priority.get(&p).copied().unwrap_or(0)
    }
}

/// Dashboard-level summary of a task collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats<'a> {
    pub total: usize,
    pub by_status: BTreeMap<Status, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub overdue_count: usize,
    pub due_soon_count: usize,
    /// Open tasks that are high priority, due soon or overdue; first N in input order.
    pub urgent_tasks: Vec<&'a Task>,
    /// Most recently updated tasks across every status.
    pub recent_tasks: Vec<&'a Task>,
    pub assignee_rollups: Vec<AssigneeRollup>,
}

impl TaskStats<'_> {
    pub fn status_count(&self, s: Status) -> usize {
        self.by_status.get(&s).copied().unwrap_or(0)
    }

    pub fn priority_count(&self, p: Priority) -> usize {
        self.by_priority.get(&p).copied().unwrap_or(0)
    }

    /// Completed share of all tasks, 0.0 when there are none.
    pub fn completion_rate(&self) -> f64 {
        completion_rate(self.status_count(Status::Completed), self.total)
    }

    /// Completion rate as a whole percentage.
    pub fn completion_percent(&self) -> u32 {
        (self.completion_rate() * 100.0).round() as u32
    }
}

pub fn completion_rate(completed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

pub fn compute_stats<'a>(tasks: &[&'a Task], today: NaiveDate, settings: StatsSettings) -> TaskStats<'a> {
    let mut by_status = BTreeMap::new();
    let mut by_priority = BTreeMap::new();
    let mut overdue_count = 0;
    let mut due_soon_count = 0;
    let mut urgent_tasks = Vec::new();
    let mut rollups: Vec<AssigneeRollup> = Vec::new();
    let mut rollup_index: HashMap<String, usize> = HashMap::new();

    for &task in tasks {
        *by_status.entry(task.status).or_insert(0) += 1;
        *by_priority.entry(task.priority).or_insert(0) += 1;

        let state = due_state(task, today, settings.due_soon_days);
        match state {
            DueState::Overdue => overdue_count += 1,
            DueState::DueSoon => due_soon_count += 1,
            DueState::Scheduled | DueState::Unscheduled | DueState::Done => {}
        }

        let urgent = state != DueState::Done
            && (task.priority == Priority::High || matches!(state, DueState::Overdue | DueState::DueSoon));
        if urgent && urgent_tasks.len() < settings.urgent_limit {
            urgent_tasks.push(task);
        }

        let name = task.assignee_label();
        let slot = match rollup_index.get(name) {
            Some(&i) => i,
            None => {
                rollup_index.insert(name.to_string(), rollups.len());
                rollups.push(AssigneeRollup::new(name, name == UNASSIGNED));
                rollups.len() - 1
            }
        };
        let rollup = &mut rollups[slot];
        rollup.total += 1;
        *rollup.by_priority.entry(task.priority).or_insert(0) += 1;
        if task.is_completed() {
            rollup.completed += 1;
        } else {
            rollup.pending += 1;
        }
    }

    // Busiest first, "Unassigned" always last; ties keep first-seen order.
    rollups.sort_by(|a, b| a.unassigned.cmp(&b.unassigned).then(b.total.cmp(&a.total)));

    let mut recent_tasks = sort_tasks(tasks.iter().copied(), SortKey::Updated);
    recent_tasks.truncate(settings.recent_limit);

    TaskStats {
        total: tasks.len(),
        by_status,
        by_priority,
        overdue_count,
        due_soon_count,
        urgent_tasks,
        recent_tasks,
        assignee_rollups: rollups,
    }
}
