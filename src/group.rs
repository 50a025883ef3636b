//! Partitioning a task list into labelled buckets.

use std::collections::HashMap;

use crate::fields::*;
use crate::task::Task;

/// Label of the single bucket produced by [`GroupBy::None`].
pub const ALL_TASKS: &str = "All Tasks";

/// One labelled bucket. Tasks keep their relative input order.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGroup<'a> {
    pub label: String,
    pub tasks: Vec<&'a Task>,
}

/// Bucket key of `task` under `key`.
pub fn group_label(task: &Task, key: GroupBy) -> &str {
    match key {
        GroupBy::None => ALL_TASKS,
        GroupBy::Topic => &task.primary_topic,
        GroupBy::Assignee => task.assignee_label(),
        GroupBy::Priority => task.priority.label(),
        GroupBy::Status => task.status.label(),
    }
}

/// Group tasks by `key`. Buckets appear in first-encounter order.
///
/// Sort before grouping when a global order should carry into each bucket.
pub fn group_tasks<'a, I>(tasks: I, key: GroupBy) -> Vec<TaskGroup<'a>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut groups: Vec<TaskGroup<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        let label = group_label(task, key);
        let slot = match index.get(label) {
            Some(&i) => i,
            None => {
                index.insert(label.to_string(), groups.len());
                groups.push(TaskGroup { label: label.to_string(), tasks: Vec::new() });
                groups.len() - 1
            }
        };
        groups[slot].tasks.push(task);
    }
    if groups.is_empty() && key == GroupBy::None {
        groups.push(TaskGroup { label: ALL_TASKS.to_string(), tasks: Vec::new() });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::fixtures::*;
    use crate::task::UNASSIGNED;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Task> {
        let mut a = task("1", "Work/Projects/Alpha");
        a.priority = Priority::High;
        a.deadline = Some(date("2024-12-15"));
        let mut b = task("2", "Work/Projects/Beta");
        b.priority = Priority::Low;
        b.status = Status::Completed;
        b.assignee = Some("Ana".into());
        let mut c = task("3", "Work/Projects/Alpha");
        c.status = Status::InProgress;
        vec![a, b, c]
    }

    fn labels(groups: &[TaskGroup<'_>]) -> Vec<String> {
        groups.iter().map(|g| g.label.clone()).collect()
    }

    #[test]
    fn topic_groups_use_full_path_in_encounter_order() {
        let tasks = sample();
        let groups = group_tasks(&tasks[..2], GroupBy::Topic);
        assert_eq!(labels(&groups), vec!["Work/Projects/Alpha", "Work/Projects/Beta"]);
        assert!(groups.iter().all(|g| g.tasks.len() == 1));

        let groups = group_tasks(&tasks, GroupBy::Topic);
        let alpha: Vec<&str> = groups[0].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(alpha, vec!["1", "3"]);
    }

    #[test]
    fn labels_per_key() {
        let tasks = sample();
        assert_eq!(labels(&group_tasks(&tasks, GroupBy::None)), vec![ALL_TASKS]);
        assert_eq!(labels(&group_tasks(&tasks, GroupBy::Assignee)), vec![UNASSIGNED, "Ana"]);
        assert_eq!(labels(&group_tasks(&tasks, GroupBy::Priority)), vec!["High", "Low", "Medium"]);
        assert_eq!(
            labels(&group_tasks(&tasks, GroupBy::Status)),
            vec!["Pending", "Completed", "In Progress"]
        );
    }

    #[test]
    fn every_key_partitions_the_input() {
        let tasks = sample();
        for key in [GroupBy::None, GroupBy::Topic, GroupBy::Assignee, GroupBy::Priority, GroupBy::Status] {
            let groups = group_tasks(&tasks, key);
            let mut seen: Vec<&str> = groups
                .iter()
                .flat_map(|g| g.tasks.iter().map(|t| t.id.as_str()))
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, vec!["1", "2", "3"], "partition broken for {key:?}");
        }
    }

    #[test]
    fn empty_input() {
        let tasks: Vec<Task> = Vec::new();
        assert!(group_tasks(&tasks, GroupBy::Topic).is_empty());
        let all = group_tasks(&tasks, GroupBy::None);
        assert_eq!(labels(&all), vec![ALL_TASKS]);
        assert!(all[0].tasks.is_empty());
    }
}
