//! Single-key task ordering.
//!
//! Sorting is stable: tasks that compare equal under the chosen key keep their
//! input order. No secondary key is applied.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::fields::*;
use crate::task::Task;

/// Ascending dates with a missing deadline treated as later than any date.
pub fn compare_deadlines(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Dictionary-style comparison: letters compare case-insensitively first, and
/// only then does lowercase sort ahead of uppercase.
pub fn compare_topics(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| b.cmp(a))
}

pub fn compare(a: &Task, b: &Task, key: SortKey) -> Ordering {
    match key {
        SortKey::Deadline => compare_deadlines(a.deadline, b.deadline),
        SortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
        SortKey::Created => b.created_at.cmp(&a.created_at),
        SortKey::Updated => b.updated_at.cmp(&a.updated_at),
        SortKey::Topic => compare_topics(&a.primary_topic, &b.primary_topic),
    }
}

/// Return a new sequence ordered by `key`.
pub fn sort_tasks<'a, I>(tasks: I, key: SortKey) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut sorted: Vec<&Task> = tasks.into_iter().collect();
    sorted.sort_by(|a, b| compare(a, b, key));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::*;
    use pretty_assertions::assert_eq;

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn missing_deadline_sorts_last() {
        let undated = task("undated", "A");
        let mut dated = task("dated", "A");
        dated.deadline = Some(date("2024-01-01"));
        let tasks = vec![undated, dated];
        assert_eq!(ids(&sort_tasks(&tasks, SortKey::Deadline)), vec!["dated", "undated"]);
    }

    #[test]
    fn undated_ties_keep_input_order() {
        let mut early = task("early", "A");
        early.deadline = Some(date("2024-03-01"));
        let tasks = vec![task("x", "A"), early, task("y", "A")];
        assert_eq!(ids(&sort_tasks(&tasks, SortKey::Deadline)), vec!["early", "x", "y"]);
    }

    #[test]
    fn priority_is_high_first_and_idempotent() {
        let mut low = task("low", "A");
        low.priority = Priority::Low;
        let mut high = task("high", "A");
        high.priority = Priority::High;
        let mut high2 = task("high2", "A");
        high2.priority = Priority::High;
        let tasks = vec![low, task("med", "A"), high, high2];

        let once = sort_tasks(&tasks, SortKey::Priority);
        assert_eq!(ids(&once), vec!["high", "high2", "med", "low"]);
        let twice = sort_tasks(once.iter().copied(), SortKey::Priority);
        assert_eq!(ids(&twice), ids(&once));
    }

    #[test]
    fn timestamps_sort_newest_first() {
        let mut old = task("old", "A");
        old.created_at = ts(0);
        old.updated_at = ts(50);
        let mut new = task("new", "A");
        new.created_at = ts(10);
        new.updated_at = ts(20);
        let tasks = vec![old, new];
        assert_eq!(ids(&sort_tasks(&tasks, SortKey::Created)), vec!["new", "old"]);
        assert_eq!(ids(&sort_tasks(&tasks, SortKey::Updated)), vec!["old", "new"]);
    }

    #[test]
    fn topic_order_is_case_insensitive() {
        let tasks = vec![task("1", "work/b"), task("2", "Home"), task("3", "Work/A"), task("4", "alpha")];
        assert_eq!(ids(&sort_tasks(&tasks, SortKey::Topic)), vec!["4", "2", "3", "1"]);
        assert_eq!(compare_topics("a", "A"), Ordering::Less);
    }
}
