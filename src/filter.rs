//! Multi-field task filtering.
//!
//! A `TaskFilter` carries five independent constraints. An absent (or empty) field
//! places no constraint; present fields combine with AND. Filtering is a pure,
//! order-preserving subsequence of the input.

use serde::{Deserialize, Serialize};

use crate::fields::*;
use crate::task::{Task, UNASSIGNED};

/// Filter state shared by the CLI, the dashboard and the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<Status>,
    /// Prefix of the primary topic.
    pub topic: Option<String>,
    /// Exact assignee, or [`UNASSIGNED`] for tasks without one.
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    /// Case-insensitive text searched in description, topic and assignee.
    pub search: Option<String>,
}

impl TaskFilter {
    /// True when no field constrains anything.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && non_empty(&self.topic).is_none()
            && non_empty(&self.assignee).is_none()
            && non_empty(&self.search).is_none()
    }

    /// Number of active constraints, for status displays.
    pub fn active_count(&self) -> usize {
        [
            self.status.is_some(),
            non_empty(&self.topic).is_some(),
            non_empty(&self.assignee).is_some(),
            self.priority.is_some(),
            non_empty(&self.search).is_some(),
        ]
        .iter()
        .filter(|&&on| on)
        .count()
    }

    pub fn matches(&self, task: &Task, topic_match: TopicMatch) -> bool {
        if let Some(s) = self.status {
            if task.status != s {
                return false;
            }
        }
        if let Some(p) = self.priority {
            if task.priority != p {
                return false;
            }
        }
        if let Some(topic) = non_empty(&self.topic) {
            if !topic_matches(&task.primary_topic, topic, topic_match) {
                return false;
            }
        }
        if let Some(assignee) = non_empty(&self.assignee) {
            if !assignee_matches(task, assignee) {
                return false;
            }
        }
        if let Some(needle) = non_empty(&self.search) {
            if !search_matches(task, needle) {
                return false;
            }
        }
        true
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Topic constraint test.
///
/// `Prefix` is a plain string prefix, so "Work" also matches "Workshop/X".
/// `Segment` requires the match to end on a path boundary.
pub fn topic_matches(topic: &str, wanted: &str, mode: TopicMatch) -> bool {
    match mode {
        TopicMatch::Prefix => topic.starts_with(wanted),
        TopicMatch::Segment => match topic.strip_prefix(wanted) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || wanted.ends_with('/'),
            None => false,
        },
    }
}

/// Exact assignee match; the [`UNASSIGNED`] sentinel selects tasks without an assignee.
pub fn assignee_matches(task: &Task, wanted: &str) -> bool {
    if wanted == UNASSIGNED {
        task.is_unassigned()
    } else {
        task.assignee.as_deref() == Some(wanted)
    }
}

/// Case-insensitive substring match on description, primary topic or assignee.
pub fn search_matches(task: &Task, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    task.description.to_lowercase().contains(&needle)
        || task.primary_topic.to_lowercase().contains(&needle)
        || task
            .assignee
            .as_ref()
            .map_or(false, |a| a.to_lowercase().contains(&needle))
}

/// Keep the tasks matching `filter`, in input order.
pub fn filter_tasks<'a, I>(tasks: I, filter: &TaskFilter, topic_match: TopicMatch) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|t| filter.matches(t, topic_match))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Task> {
        let mut a = task("1", "Work/Projects/Alpha");
        a.priority = Priority::High;
        a.assignee = Some("Ana".into());
        a.description = "Draft the Alpha proposal".into();
        let mut b = task("2", "Workshop/Tools");
        b.priority = Priority::High;
        b.status = Status::Completed;
        let mut c = task("3", "Home");
        c.priority = Priority::Low;
        c.assignee = Some(String::new());
        let mut d = task("4", "Work");
        d.assignee = Some("Ben".into());
        vec![a, b, c, d]
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn empty_filter_is_identity() {
        let tasks = sample();
        let out = filter_tasks(&tasks, &TaskFilter::default(), TopicMatch::Prefix);
        assert_eq!(ids(&out), vec!["1", "2", "3", "4"]);

        let blank = TaskFilter { topic: Some(String::new()), search: Some(String::new()), ..Default::default() };
        assert!(blank.is_empty());
        assert_eq!(filter_tasks(&tasks, &blank, TopicMatch::Prefix).len(), 4);
    }

    #[test]
    fn composed_filters_equal_sequential_filters() {
        let tasks = sample();
        let both = TaskFilter { status: Some(Status::Pending), priority: Some(Priority::High), ..Default::default() };
        let status_only = TaskFilter { status: Some(Status::Pending), ..Default::default() };
        let priority_only = TaskFilter { priority: Some(Priority::High), ..Default::default() };

        let once = filter_tasks(&tasks, &both, TopicMatch::Prefix);
        let first = filter_tasks(&tasks, &status_only, TopicMatch::Prefix);
        let twice = filter_tasks(first, &priority_only, TopicMatch::Prefix);
        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(ids(&once), vec!["1"]);
    }

    #[test]
    fn prefix_mode_keeps_sibling_false_positive() {
        let tasks = sample();
        let f = TaskFilter { topic: Some("Work".into()), ..Default::default() };
        assert_eq!(ids(&filter_tasks(&tasks, &f, TopicMatch::Prefix)), vec!["1", "2", "4"]);
        assert_eq!(ids(&filter_tasks(&tasks, &f, TopicMatch::Segment)), vec!["1", "4"]);
    }

    #[test]
    fn segment_mode_boundaries() {
        assert!(topic_matches("Work", "Work", TopicMatch::Segment));
        assert!(topic_matches("Work/Projects", "Work", TopicMatch::Segment));
        assert!(topic_matches("Work/Projects", "Work/", TopicMatch::Segment));
        assert!(!topic_matches("Worker/Thing", "Work", TopicMatch::Segment));
        assert!(topic_matches("Worker/Thing", "Work", TopicMatch::Prefix));
    }

    #[test]
    fn unassigned_sentinel_matches_missing_and_empty() {
        let tasks = sample();
        let f = TaskFilter { assignee: Some(UNASSIGNED.into()), ..Default::default() };
        assert_eq!(ids(&filter_tasks(&tasks, &f, TopicMatch::Prefix)), vec!["2", "3"]);

        let ana = TaskFilter { assignee: Some("Ana".into()), ..Default::default() };
        assert_eq!(ids(&filter_tasks(&tasks, &ana, TopicMatch::Prefix)), vec!["1"]);
    }

    #[test]
    fn search_covers_description_topic_and_assignee() {
        let tasks = sample();
        let by_desc = TaskFilter { search: Some("PROPOSAL".into()), ..Default::default() };
        assert_eq!(ids(&filter_tasks(&tasks, &by_desc, TopicMatch::Prefix)), vec!["1"]);
        let by_topic = TaskFilter { search: Some("tools".into()), ..Default::default() };
        assert_eq!(ids(&filter_tasks(&tasks, &by_topic, TopicMatch::Prefix)), vec!["2"]);
        let by_assignee = TaskFilter { search: Some("ben".into()), ..Default::default() };
        assert_eq!(ids(&filter_tasks(&tasks, &by_assignee, TopicMatch::Prefix)), vec!["4"]);
    }

    #[test]
    fn active_count_ignores_blank_strings() {
        let f = TaskFilter {
            status: Some(Status::Pending),
            search: Some(String::new()),
            assignee: Some("Ana".into()),
            ..Default::default()
        };
        assert_eq!(f.active_count(), 2);
    }
}
