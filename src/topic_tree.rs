//! Hierarchical topic tree built from slash-delimited topic paths.
//!
//! The tree is derived data: it borrows the tasks it was built from and is rebuilt
//! from scratch whenever the task snapshot changes. Path strings are taken as given,
//! so empty segments from leading, trailing or doubled slashes become nodes named "".

use std::collections::BTreeMap;

use crate::task::Task;

/// One level of the topic hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicNode<'a> {
    pub name: String,
    /// Slash-joined path from the root; empty for the root itself.
    pub full_path: String,
    /// Tasks whose primary topic passes through or ends at this node.
    pub task_count: usize,
    /// Tasks whose primary topic ends exactly here, in input order.
    pub tasks: Vec<&'a Task>,
    /// Children keyed by segment name. Iteration is alphabetical.
    pub children: BTreeMap<String, TopicNode<'a>>,
}

/// A flattened row of the tree for list rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLine<'n, 'a> {
    pub depth: usize,
    pub node: &'n TopicNode<'a>,
}

impl<'a> TopicNode<'a> {
    fn new(name: &str, full_path: String) -> Self {
        TopicNode {
            name: name.to_string(),
            full_path,
            task_count: 0,
            tasks: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Look up a node by its full path. The empty path is the root.
    pub fn find(&self, path: &str) -> Option<&TopicNode<'a>> {
        if path.is_empty() {
            return Some(self);
        }
        let mut node = self;
        for segment in path.split('/') {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Depth-first rows below this node. Children of a node are only descended into
    /// when `expanded` returns true for its full path.
    pub fn flatten<F>(&self, expanded: F) -> Vec<TreeLine<'_, 'a>>
    where
        F: Fn(&str) -> bool,
    {
        let mut out = Vec::new();
        self.flatten_into(0, &expanded, &mut out);
        out
    }

    fn flatten_into<'n, F>(&'n self, depth: usize, expanded: &F, out: &mut Vec<TreeLine<'n, 'a>>)
    where
        F: Fn(&str) -> bool,
    {
        for child in self.children.values() {
            out.push(TreeLine { depth, node: child });
            if expanded(&child.full_path) {
                child.flatten_into(depth + 1, expanded, out);
            }
        }
    }
}

/// Build the topic tree for `tasks`. The root stands for "all topics".
pub fn build_topic_tree<'a, I>(tasks: I) -> TopicNode<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut root = TopicNode::new("", String::new());
    for task in tasks {
        root.task_count += 1;
        let mut node = &mut root;
        for (depth, segment) in task.primary_topic.split('/').enumerate() {
            let full_path = if depth == 0 {
                segment.to_string()
            } else {
                format!("{}/{}", node.full_path, segment)
            };
            node = node
                .children
                .entry(segment.to_string())
                .or_insert_with(|| TopicNode::new(segment, full_path));
            node.task_count += 1;
        }
        node.tasks.push(task);
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Priority, Status};
    use crate::task::fixtures::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scenario_counts_every_level() {
        let mut alpha = task("1", "Work/Projects/Alpha");
        alpha.priority = Priority::High;
        alpha.deadline = Some(date("2024-12-15"));
        let mut beta = task("2", "Work/Projects/Beta");
        beta.priority = Priority::Low;
        beta.status = Status::Completed;
        let tasks = vec![alpha, beta];

        let root = build_topic_tree(&tasks);
        assert_eq!(root.task_count, 2);
        assert_eq!(root.children.keys().collect::<Vec<_>>(), vec!["Work"]);

        let work = &root.children["Work"];
        assert_eq!(work.task_count, 2);
        assert_eq!(work.full_path, "Work");
        let projects = &work.children["Projects"];
        assert_eq!(projects.task_count, 2);
        assert_eq!(projects.full_path, "Work/Projects");
        assert_eq!(projects.children.keys().collect::<Vec<_>>(), vec!["Alpha", "Beta"]);
        assert_eq!(projects.children["Alpha"].task_count, 1);
        assert_eq!(projects.children["Beta"].task_count, 1);
        assert_eq!(projects.children["Beta"].full_path, "Work/Projects/Beta");
        assert!(projects.tasks.is_empty());
        assert_eq!(projects.children["Alpha"].tasks[0].id, "1");
    }

    #[test]
    fn root_children_conserve_task_count() {
        let tasks = vec![
            task("1", "Work/A"),
            task("2", "Home"),
            task("3", "Work"),
            task("4", ""),
            task("5", "/Lead"),
        ];
        let root = build_topic_tree(&tasks);
        let sum: usize = root.children.values().map(|c| c.task_count).sum();
        assert_eq!(root.task_count, tasks.len());
        assert_eq!(sum, tasks.len());
    }

    #[test]
    fn empty_segments_are_literal_nodes() {
        let tasks = vec![task("1", ""), task("2", "Work//Deep/")];
        let root = build_topic_tree(&tasks);
        assert_eq!(root.children[""].tasks.len(), 1);
        let work = &root.children["Work"];
        let blank = &work.children[""];
        assert_eq!(blank.full_path, "Work/");
        let deep = &blank.children["Deep"];
        assert_eq!(deep.children[""].tasks[0].id, "2");
    }

    #[test]
    fn tasks_stay_in_input_order_at_terminal_node() {
        let tasks = vec![task("b", "X"), task("a", "X"), task("c", "X")];
        let root = build_topic_tree(&tasks);
        let ids: Vec<&str> = root.children["X"].tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn flatten_is_alphabetical_and_respects_expansion() {
        let tasks = vec![task("1", "Zeta/One"), task("2", "Alpha/Two"), task("3", "Alpha/One")];
        let root = build_topic_tree(&tasks);

        let collapsed: Vec<&str> = root.flatten(|_| false).iter().map(|l| l.node.name.as_str()).collect();
        assert_eq!(collapsed, vec!["Alpha", "Zeta"]);

        let open: Vec<(usize, &str)> = root
            .flatten(|p| p == "Alpha")
            .iter()
            .map(|l| (l.depth, l.node.full_path.as_str()))
            .collect();
        assert_eq!(open, vec![(0, "Alpha"), (1, "Alpha/One"), (1, "Alpha/Two"), (0, "Zeta")]);
    }

    #[test]
    fn find_by_full_path() {
        let tasks = vec![task("1", "Work/A"), task("2", "Work"), task("3", "Home")];
        let root = build_topic_tree(&tasks);
        let work = root.find("Work").unwrap();
        assert_eq!(work.task_count, 2);
        assert_eq!(work.tasks[0].id, "2");
        assert_eq!(root.find("Work/A").unwrap().tasks[0].id, "1");
        assert!(root.find("Work/Missing").is_none());
        assert_eq!(root.find("").unwrap().task_count, 3);
    }
}
