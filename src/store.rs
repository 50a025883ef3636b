//! Task API contract and its local JSON-file implementation.
//!
//! The dashboard only ever talks to a [`TaskApi`]: it fetches a full snapshot,
//! runs its pipeline over it, and re-fetches after any mutation. `TaskStore` keeps
//! the whole document in memory and rewrites the file atomically on every change.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::fields::*;
use crate::filter::{filter_tasks, TaskFilter};
use crate::sort::sort_tasks;
use crate::task::{NewTask, Task, TaskUpdate, UNASSIGNED};

pub const ID_PREFIX: &str = "task:";
pub const DOCUMENT_VERSION: &str = "1.0";

/// Result window for [`TaskApi::list_tasks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Pagination {
    pub fn all() -> Self {
        Pagination { limit: usize::MAX, offset: 0 }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination { limit: 100, offset: 0 }
    }
}

/// One page of matching tasks, newest-created first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPage {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub count: usize,
    pub tasks: Vec<Task>,
}

/// Collection-wide counters as reported by the task service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_tasks: usize,
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub by_status: BTreeMap<Status, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub topics: Vec<String>,
    pub assignees: Vec<String>,
    pub topic_counts: BTreeMap<String, usize>,
    pub assignee_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteAck {
    pub success: bool,
    pub task_id: String,
}

/// The task service as seen by the dashboard.
pub trait TaskApi {
    fn list_tasks(&self, filter: &TaskFilter, page: Pagination) -> Result<TaskPage>;
    fn get_stats(&self) -> Result<StoreStats>;
    fn get_task(&self, id: &str) -> Result<Task>;
    fn create_task(&mut self, new: NewTask) -> Result<Task>;
    fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task>;
    fn complete_task(&mut self, id: &str) -> Result<Task>;
    fn reopen_task(&mut self, id: &str) -> Result<Task>;
    fn delete_task(&mut self, id: &str) -> Result<DeleteAck>;
    fn add_note(&mut self, id: &str, text: &str) -> Result<Task>;

    /// Every task, as one snapshot.
    fn snapshot(&self) -> Result<Vec<Task>> {
        Ok(self.list_tasks(&TaskFilter::default(), Pagination::all())?.tasks)
    }
}

/// Accept both `task:abc` and bare `abc`.
pub fn normalize_id(id: &str) -> String {
    if id.starts_with(ID_PREFIX) {
        id.to_string()
    } else {
        format!("{ID_PREFIX}{id}")
    }
}

fn new_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{ID_PREFIX}{}", &hex[..12])
}

fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// On-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "tasks_list_or_map")]
    pub tasks: Vec<Task>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// Older files keyed tasks by id in an object instead of listing them.
fn tasks_list_or_map<'de, D>(deserializer: D) -> std::result::Result<Vec<Task>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(id, mut v)| {
                if let Value::Object(fields) = &mut v {
                    fields.entry("@id").or_insert(Value::String(id));
                }
                serde_json::from_value(v).map_err(D::Error::custom)
            })
            .collect(),
        other => Err(D::Error::custom(format!("expected task list, found {other}"))),
    }
}

/// Write through `<path>.tmp` and rename over `path`. The temp file is removed
/// when any step fails.
fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let written = File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(data.as_bytes())?;
            f.flush()
        })
        .and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        if tmp.exists() {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::warn!(path = %tmp.display(), error = %cleanup, "could not remove temp file");
            }
        }
        tracing::error!(path = %path.display(), error = %e, "failed to write task file");
        return Err(e.into());
    }
    Ok(())
}

/// JSON-file backed task service.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    doc: TaskDocument,
    topic_match: TopicMatch,
}

impl TaskStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path, topic_match: TopicMatch) -> Result<Self> {
        let doc = Self::read(path)?;
        tracing::debug!(path = %path.display(), tasks = doc.tasks.len(), "opened task store");
        Ok(TaskStore { path: path.to_path_buf(), doc, topic_match })
    }

    fn read(path: &Path) -> Result<TaskDocument> {
        if !path.exists() {
            return Ok(TaskDocument { version: default_version(), ..TaskDocument::default() });
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Re-read the file, discarding the in-memory copy.
    pub fn reload(&mut self) -> Result<()> {
        self.doc = Self::read(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.doc.tasks
    }

    /// Persist `doc` and adopt it as the in-memory copy. On failure the store
    /// keeps its previous document.
    fn commit(&mut self, mut doc: TaskDocument) -> Result<()> {
        doc.last_updated = Some(now());
        let data = serde_json::to_string_pretty(&doc)?;
        write_atomic(&self.path, &data)?;
        self.doc = doc;
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize> {
        let id = normalize_id(id);
        self.doc
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::NotFound(id))
    }

    /// Run `change` on one task, persist, and return the updated copy.
    fn mutate<F>(&mut self, id: &str, change: F) -> Result<Task>
    where
        F: FnOnce(&mut Task, DateTime<FixedOffset>),
    {
        let idx = self.position(id)?;
        let mut doc = self.doc.clone();
        change(&mut doc.tasks[idx], now());
        let task = doc.tasks[idx].clone();
        self.commit(doc)?;
        Ok(task)
    }
}

impl TaskApi for TaskStore {
    fn list_tasks(&self, filter: &TaskFilter, page: Pagination) -> Result<TaskPage> {
        let matching = filter_tasks(&self.doc.tasks, filter, self.topic_match);
        let ordered = sort_tasks(matching, SortKey::Created);
        let total = ordered.len();
        let tasks: Vec<Task> = ordered
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect();
        Ok(TaskPage { total, limit: page.limit, offset: page.offset, count: tasks.len(), tasks })
    }

    fn get_stats(&self) -> Result<StoreStats> {
        let mut by_status = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        let mut topic_counts = BTreeMap::new();
        let mut assignee_counts = BTreeMap::new();
        let mut assignees = BTreeSet::new();
        for t in &self.doc.tasks {
            *by_status.entry(t.status).or_insert(0) += 1;
            *by_priority.entry(t.priority).or_insert(0) += 1;
            *topic_counts.entry(t.primary_topic.clone()).or_insert(0) += 1;
            *assignee_counts.entry(t.assignee_label().to_string()).or_insert(0) += 1;
            if !t.is_unassigned() {
                assignees.insert(t.assignee_label().to_string());
            }
        }
        Ok(StoreStats {
            total_tasks: self.doc.tasks.len(),
            last_updated: self.doc.last_updated,
            by_status,
            by_priority,
            topics: topic_counts.keys().cloned().collect(),
            assignees: assignees.into_iter().collect(),
            topic_counts,
            assignee_counts,
        })
    }

    fn get_task(&self, id: &str) -> Result<Task> {
        let idx = self.position(id)?;
        Ok(self.doc.tasks[idx].clone())
    }

    fn create_task(&mut self, new: NewTask) -> Result<Task> {
        if new.description.trim().is_empty() {
            return Err(Error::InvalidInput("description is required".into()));
        }
        let task = Task::from_new(new_id(), new, now());
        let mut doc = self.doc.clone();
        doc.tasks.push(task.clone());
        self.commit(doc)?;
        tracing::info!(task_id = %task.id, topic = %task.primary_topic, "created task");
        Ok(task)
    }

    fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        if matches!(&update.description, Some(d) if d.trim().is_empty()) {
            return Err(Error::InvalidInput("description must not be empty".into()));
        }
        let task = self.mutate(id, |t, now| t.apply_update(update, now))?;
        tracing::info!(task_id = %task.id, "updated task");
        Ok(task)
    }

    fn complete_task(&mut self, id: &str) -> Result<Task> {
        let task = self.mutate(id, |t, now| t.complete(now))?;
        tracing::info!(task_id = %task.id, "completed task");
        Ok(task)
    }

    fn reopen_task(&mut self, id: &str) -> Result<Task> {
        let task = self.mutate(id, |t, now| t.reopen(now))?;
        tracing::info!(task_id = %task.id, "reopened task");
        Ok(task)
    }

    fn delete_task(&mut self, id: &str) -> Result<DeleteAck> {
        let idx = self.position(id)?;
        let mut doc = self.doc.clone();
        let removed = doc.tasks.remove(idx);
        self.commit(doc)?;
        tracing::info!(task_id = %removed.id, "deleted task");
        Ok(DeleteAck { success: true, task_id: removed.id })
    }

    fn add_note(&mut self, id: &str, text: &str) -> Result<Task> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("note text is required".into()));
        }
        let task = self.mutate(id, |t, now| t.add_note(text, now))?;
        tracing::info!(task_id = %task.id, notes = task.notes.len(), "added note");
        Ok(task)
    }
}

/// A consolidated task file as produced by the extraction pipeline.
#[derive(Debug, Default, Deserialize)]
pub struct ConsolidatedFile {
    #[serde(default)]
    pub tasks: Vec<NewTask>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub dry_run: bool,
    /// `(new id, description)`; the id is `None` on a dry run.
    pub imported: Vec<(Option<String>, String)>,
    pub skipped: usize,
}

/// Create a task for every entry of a consolidated file.
pub fn import_consolidated(api: &mut dyn TaskApi, file: &Path, dry_run: bool) -> Result<ImportReport> {
    let raw = fs::read_to_string(file)?;
    let consolidated: ConsolidatedFile = serde_json::from_str(&raw)?;
    let mut report = ImportReport { dry_run, ..ImportReport::default() };
    for (i, entry) in consolidated.tasks.into_iter().enumerate() {
        if entry.description.trim().is_empty() {
            tracing::warn!(index = i, "skipping consolidated task without description");
            report.skipped += 1;
            continue;
        }
        let description = entry.description.clone();
        if dry_run {
            report.imported.push((None, description));
        } else {
            let task = api.create_task(entry)?;
            report.imported.push((Some(task.id), description));
        }
    }
    tracing::info!(count = report.imported.len(), skipped = report.skipped, dry_run, "import finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store() -> (TempDir, TaskStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::open(&dir.path().join("tasks.json"), TopicMatch::Prefix).unwrap();
        (dir, store)
    }

    fn new(desc: &str, topic: &str) -> NewTask {
        NewTask {
            description: desc.into(),
            primary_topic: Some(topic.into()),
            ..NewTask::default()
        }
    }

    #[test]
    fn create_assigns_prefixed_id_and_persists() {
        let (dir, mut store) = store();
        let task = store.create_task(new("Write report", "Work")).unwrap();
        assert!(task.id.starts_with(ID_PREFIX));
        assert_eq!(task.id.len(), ID_PREFIX.len() + 12);

        let reopened = TaskStore::open(&dir.path().join("tasks.json"), TopicMatch::Prefix).unwrap();
        assert_eq!(reopened.tasks(), &[task]);
    }

    #[test]
    fn create_rejects_blank_description() {
        let (_dir, mut store) = store();
        let err = store.create_task(new("  ", "Work")).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn ids_resolve_with_or_without_prefix() {
        let (_dir, mut store) = store();
        let task = store.create_task(new("A", "Work")).unwrap();
        let bare = task.id.trim_start_matches(ID_PREFIX);
        assert_eq!(store.get_task(bare).unwrap().id, task.id);
        assert!(matches!(store.get_task("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn complete_and_reopen_keep_invariant() {
        let (_dir, mut store) = store();
        let id = store.create_task(new("A", "Work")).unwrap().id;
        store
            .update_task(&id, TaskUpdate { status: Some(Status::InProgress), ..Default::default() })
            .unwrap();
        let done = store.complete_task(&id).unwrap();
        assert!(done.completed_at.is_some());
        let back = store.reopen_task(&id).unwrap();
        assert_eq!(back.status, Status::Pending);
        assert_eq!(back.completed_at, None);
        assert!(back.updated_at >= back.created_at);
    }

    #[test]
    fn list_filters_windows_and_counts() {
        let (_dir, mut store) = store();
        for i in 0..5 {
            store.create_task(new(&format!("work {i}"), "Work/Ops")).unwrap();
        }
        store.create_task(new("home", "Home")).unwrap();
        let filter = TaskFilter { topic: Some("Work".into()), ..Default::default() };
        let page = store.list_tasks(&filter, Pagination { limit: 2, offset: 1 }).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.count, 2);
        assert!(page.tasks.iter().all(|t| t.primary_topic == "Work/Ops"));
        assert_eq!(store.snapshot().unwrap().len(), 6);
    }

    #[test]
    fn stats_fold_unassigned() {
        let (_dir, mut store) = store();
        store.create_task(new("a", "Work")).unwrap();
        store
            .create_task(NewTask { assignee: Some("Ana".into()), ..new("b", "Home") })
            .unwrap();
        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.topics, vec!["Home", "Work"]);
        assert_eq!(stats.assignees, vec!["Ana"]);
        assert_eq!(stats.assignee_counts.get(UNASSIGNED), Some(&1));
        assert_eq!(stats.by_status.get(&Status::Pending), Some(&2));
        assert!(stats.last_updated.is_some());
    }

    #[test]
    fn delete_and_notes() {
        let (_dir, mut store) = store();
        let id = store.create_task(new("a", "Work")).unwrap().id;
        let noted = store.add_note(&id, "called back").unwrap();
        assert_eq!(noted.notes.len(), 1);
        assert!(store.add_note(&id, " ").is_err());
        let ack = store.delete_task(&id).unwrap();
        assert_eq!(ack, DeleteAck { success: true, task_id: id.clone() });
        assert!(store.delete_task(&id).is_err());
    }

    #[test]
    fn failed_create_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut store =
            TaskStore::open(&dir.path().join("missing_dir").join("tasks.json"), TopicMatch::Prefix).unwrap();
        assert!(matches!(store.create_task(new("a", "Work")), Err(Error::Io(_))));
        assert!(store.tasks().is_empty());
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn failed_write_rolls_back_mutation_and_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = TaskStore::open(&path, TopicMatch::Prefix).unwrap();
        let id = store.create_task(new("a", "Work")).unwrap().id;

        // A directory in place of the file makes the final rename fail.
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(store.complete_task(&id).is_err());
        assert!(store.delete_task(&id).is_err());
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.get_task(&id).unwrap().status, Status::Pending);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn reads_legacy_keyed_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(
            &path,
            r#"{"version": "1.0", "tasks": {"task:aaaaaaaaaaaa": {
                "description": "legacy", "primary_topic": "Old",
                "created_at": "2024-01-01T00:00:00+00:00",
                "updated_at": "2024-01-01T00:00:00+00:00"}}}"#,
        )
        .unwrap();
        let store = TaskStore::open(&path, TopicMatch::Prefix).unwrap();
        assert_eq!(store.tasks()[0].id, "task:aaaaaaaaaaaa");
    }

    #[test]
    fn import_creates_or_previews() {
        let (dir, mut store) = store();
        let file = dir.path().join("consolidated.json");
        fs::write(
            &file,
            r#"{"tasks": [
                {"description": "Book venue", "primary_topic": "Events", "priority": "high"},
                {"primary_topic": "Nothing"},
                {"description": "Email Sam"}
            ]}"#,
        )
        .unwrap();

        let preview = import_consolidated(&mut store, &file, true).unwrap();
        assert_eq!(preview.imported.len(), 2);
        assert_eq!(preview.skipped, 1);
        assert!(store.tasks().is_empty());

        let report = import_consolidated(&mut store, &file, false).unwrap();
        assert!(report.imported.iter().all(|(id, _)| id.is_some()));
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.tasks()[1].primary_topic, "General");
    }
}
