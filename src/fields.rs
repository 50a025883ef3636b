//! Enumerations and field types for task views.
//!
//! This module defines the closed value sets the dashboard pipeline dispatches on:
//! task status and priority, plus the grouping, sorting and topic matching modes.
//! Every consumer matches on these exhaustively so a new variant is a compile error
//! at each decision point rather than a silent fallthrough.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    #[value(alias = "in_progress")]
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    /// Wire and query-string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }

    /// Display label, also used as the group bucket key.
    pub fn label(self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "In Progress",
            Status::Completed => "Completed",
        }
    }
}

/// Task priority. Declaration order is the sort order: high first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Fixed ordinal used by priority ordering.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

/// The single active grouping dimension of a task view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    Topic,
    Assignee,
    Priority,
    Status,
}

impl GroupBy {
    /// Next grouping in the TUI cycle order.
    pub fn next(self) -> Self {
        match self {
            GroupBy::None => GroupBy::Topic,
            GroupBy::Topic => GroupBy::Assignee,
            GroupBy::Assignee => GroupBy::Priority,
            GroupBy::Priority => GroupBy::Status,
            GroupBy::Status => GroupBy::None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupBy::None => "None",
            GroupBy::Topic => "Topic",
            GroupBy::Assignee => "Assignee",
            GroupBy::Priority => "Priority",
            GroupBy::Status => "Status",
        }
    }
}

/// The single active sort key of a task view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Deadline,
    Priority,
    #[default]
    Created,
    Updated,
    Topic,
}

impl SortKey {
    /// Next sort key in the TUI cycle order.
    pub fn next(self) -> Self {
        match self {
            SortKey::Deadline => SortKey::Priority,
            SortKey::Priority => SortKey::Created,
            SortKey::Created => SortKey::Updated,
            SortKey::Updated => SortKey::Topic,
            SortKey::Topic => SortKey::Deadline,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Deadline => "Deadline",
            SortKey::Priority => "Priority",
            SortKey::Created => "Created",
            SortKey::Updated => "Updated",
            SortKey::Topic => "Topic",
        }
    }
}

/// How a topic constraint is compared against a task's primary topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TopicMatch {
    /// Plain string prefix: "Work" also matches "Workshop/X".
    #[default]
    Prefix,
    /// Prefix on path-segment boundaries: "Work" matches "Work" and "Work/..." only.
    Segment,
}

/// Returned when a string names no variant of a field enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue(pub String);

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown value '{}'", self.0)
    }
}

impl std::error::Error for UnknownValue {}

/// Fold separators so "in_progress", "in-progress" and "In Progress" compare equal.
fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for Status {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "pending" => Ok(Status::Pending),
            "inprogress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match fold(s).as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_wire_cli_and_label_forms() {
        assert_eq!("in_progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("in-progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("In Progress".parse::<Status>(), Ok(Status::InProgress));
        assert_eq!("COMPLETED".parse::<Status>(), Ok(Status::Completed));
        assert!("done".parse::<Status>().is_err());
    }

    #[test]
    fn priority_rank_follows_declaration_order() {
        let ranks: Vec<u8> = Priority::ALL.iter().map(|p| p.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
        assert!(Priority::High < Priority::Low);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&Status::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: Status = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(back, Status::Completed);
    }

    #[test]
    fn cycles_return_to_start() {
        let mut g = GroupBy::None;
        for _ in 0..5 {
            g = g.next();
        }
        assert_eq!(g, GroupBy::None);

        let mut s = SortKey::Deadline;
        for _ in 0..5 {
            s = s.next();
        }
        assert_eq!(s, SortKey::Deadline);
    }
}
