//! Task data structure and its lifecycle transitions.
//!
//! This module defines the `Task` record as it travels over the task API, the
//! append-only `Note` log attached to it, and the create/update payloads used by
//! the store. Lifecycle methods keep `completed_at` in step with `status`.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::fields::*;

/// Label used wherever a missing assignee has to be named.
pub const UNASSIGNED: &str = "Unassigned";

/// Topic given to tasks created without one.
pub const DEFAULT_TOPIC: &str = "General";

/// A single timestamped note. Notes are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub created_at: DateTime<FixedOffset>,
}

/// A unit of work extracted from a transcript or entered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "@id", alias = "id")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    pub primary_topic: String,
    #[serde(default)]
    pub secondary_topics: Vec<String>,
    #[serde(default = "default_status")]
    pub status: Status,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub source_transcript_id: Option<String>,
    #[serde(default)]
    pub source_transcript_title: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub completed_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_status() -> Status {
    Status::Pending
}

/// Extracted deadlines are not always dates; anything that is not `YYYY-MM-DD`
/// (optionally followed by a time part) is read as "no deadline".
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let head = s.get(..10).unwrap_or(s.as_str());
        match NaiveDate::parse_from_str(head, "%Y-%m-%d") {
            Ok(d) => Some(d),
            Err(_) => {
                tracing::debug!(deadline = %s, "ignoring non-date deadline");
                None
            }
        }
    }))
}

/// Payload for creating a task. Everything but the description is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub primary_topic: Option<String>,
    #[serde(default)]
    pub secondary_topics: Vec<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub source_transcript_id: Option<String>,
    #[serde(default)]
    pub source_transcript_title: Option<String>,
}

/// Partial update. `None` leaves a field alone; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub assignee: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub primary_topic: Option<String>,
    pub secondary_topics: Option<Vec<String>>,
    pub priority: Option<Priority>,
    pub context: Option<Option<String>>,
    pub status: Option<Status>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.assignee.is_none()
            && self.deadline.is_none()
            && self.primary_topic.is_none()
            && self.secondary_topics.is_none()
            && self.priority.is_none()
            && self.context.is_none()
            && self.status.is_none()
    }
}

impl Task {
    /// Build a fresh task from a create payload, filling in service defaults.
    pub fn from_new(id: String, new: NewTask, now: DateTime<FixedOffset>) -> Self {
        let status = new.status.unwrap_or(Status::Pending);
        let primary_topic = new
            .primary_topic
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        Task {
            id,
            description: new.description,
            assignee: new.assignee,
            deadline: new.deadline,
            priority: new.priority.unwrap_or(Priority::Medium),
            primary_topic,
            secondary_topics: new.secondary_topics,
            status,
            context: new.context,
            source_transcript_id: new.source_transcript_id,
            source_transcript_title: new.source_transcript_title,
            created_at: now,
            updated_at: now,
            completed_at: (status == Status::Completed).then_some(now),
            notes: Vec::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// True when the task has no assignee, or only whitespace.
    pub fn is_unassigned(&self) -> bool {
        self.assignee.as_deref().map_or(true, |a| a.trim().is_empty())
    }

    /// The assignee, with a missing one folded to [`UNASSIGNED`].
    pub fn assignee_label(&self) -> &str {
        if self.is_unassigned() {
            UNASSIGNED
        } else {
            self.assignee.as_deref().unwrap_or(UNASSIGNED)
        }
    }

    /// Source transcript id and title, only when both are present.
    pub fn provenance(&self) -> Option<(&str, &str)> {
        match (&self.source_transcript_id, &self.source_transcript_title) {
            (Some(id), Some(title)) => Some((id.as_str(), title.as_str())),
            _ => None,
        }
    }

    pub fn complete(&mut self, now: DateTime<FixedOffset>) {
        self.status = Status::Completed;
        self.completed_at = Some(now);
        self.touch(now);
    }

    /// Reopening always lands on `Pending`, whatever the task held before completion.
    pub fn reopen(&mut self, now: DateTime<FixedOffset>) {
        self.status = Status::Pending;
        self.completed_at = None;
        self.touch(now);
    }

    pub fn add_note(&mut self, text: impl Into<String>, now: DateTime<FixedOffset>) {
        self.notes.push(Note { text: text.into(), created_at: now });
        self.touch(now);
    }

    /// Apply the updatable fields and bump `updated_at`.
    pub fn apply_update(&mut self, update: TaskUpdate, now: DateTime<FixedOffset>) {
        if let Some(d) = update.description {
            self.description = d;
        }
        if let Some(a) = update.assignee {
            self.assignee = a;
        }
        if let Some(d) = update.deadline {
            self.deadline = d;
        }
        if let Some(t) = update.primary_topic {
            self.primary_topic = t;
        }
        if let Some(t) = update.secondary_topics {
            self.secondary_topics = t;
        }
        if let Some(p) = update.priority {
            self.priority = p;
        }
        if let Some(c) = update.context {
            self.context = c;
        }
        match update.status {
            Some(Status::Completed) if !self.is_completed() => self.complete(now),
            Some(Status::Completed) => {}
            Some(other) => {
                self.status = other;
                self.completed_at = None;
            }
            None => {}
        }
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<FixedOffset>) {
        // updated_at never moves behind created_at
        self.updated_at = now.max(self.created_at);
    }
}
