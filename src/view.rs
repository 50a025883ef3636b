//! View orchestration: interactive state, URL query mirroring, and the
//! Filter → Sort → Group pipeline.
//!
//! `ViewState` is a plain value threaded into pure pipeline functions. `Dashboard`
//! pairs it with the latest task snapshot and an inline error slot; a failed fetch
//! or mutation only sets the error, so the last good view stays on screen.

use chrono::NaiveDate;
use url::form_urlencoded;

use crate::error::Result;
use crate::fields::*;
use crate::filter::{assignee_matches, filter_tasks, topic_matches, TaskFilter};
use crate::group::{group_tasks, TaskGroup};
use crate::sort::sort_tasks;
use crate::stats::{compute_stats, StatsSettings, TaskStats};
use crate::store::TaskApi;
use crate::task::Task;
use crate::topic_tree::{build_topic_tree, TopicNode};

/// Dashboard page. Selections only apply on the page that made them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Tasks,
    Topics,
    Assignees,
}

impl Page {
    pub fn next(self) -> Self {
        match self {
            Page::Tasks => Page::Topics,
            Page::Topics => Page::Assignees,
            Page::Assignees => Page::Tasks,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::Tasks => "Tasks",
            Page::Topics => "Topics",
            Page::Assignees => "Assignees",
        }
    }
}

/// An entity picked on the Topics or Assignees page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Topic(String),
    Assignee(String),
}

/// User-driven state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Activate a grouping, or fall back to no grouping if it is already active.
    ToggleGroup(GroupBy),
    CycleGroup,
    SetSort(SortKey),
    CycleSort,
    SetStatus(Option<Status>),
    SetPriority(Option<Priority>),
    SetTopic(Option<String>),
    SetAssignee(Option<String>),
    SetSearch(Option<String>),
    ClearFilters,
    /// Selecting the selected entity again clears the selection.
    SelectTopic(String),
    SelectAssignee(String),
    ClearSelection,
    ShowPage(Page),
    ToggleCompact,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub filter: TaskFilter,
    pub group_by: GroupBy,
    pub sort_by: SortKey,
    pub page: Page,
    pub selection: Option<Selection>,
    pub compact: bool,
}

impl ViewState {
    pub fn new(group_by: GroupBy, sort_by: SortKey) -> Self {
        ViewState { group_by, sort_by, ..ViewState::default() }
    }

    /// Apply one event. Returns true when the filter changed and the query string
    /// has to be rewritten.
    pub fn apply(&mut self, event: ViewEvent) -> bool {
        let before = self.filter.clone();
        match event {
            ViewEvent::ToggleGroup(key) => {
                self.group_by = if self.group_by == key { GroupBy::None } else { key };
            }
            ViewEvent::CycleGroup => self.group_by = self.group_by.next(),
            ViewEvent::SetSort(key) => self.sort_by = key,
            ViewEvent::CycleSort => self.sort_by = self.sort_by.next(),
            ViewEvent::SetStatus(s) => self.filter.status = s,
            ViewEvent::SetPriority(p) => self.filter.priority = p,
            ViewEvent::SetTopic(t) => self.filter.topic = t.filter(|t| !t.is_empty()),
            ViewEvent::SetAssignee(a) => self.filter.assignee = a.filter(|a| !a.is_empty()),
            ViewEvent::SetSearch(q) => self.filter.search = q.filter(|q| !q.is_empty()),
            ViewEvent::ClearFilters => self.filter = TaskFilter::default(),
            ViewEvent::SelectTopic(topic) => self.toggle_selection(Selection::Topic(topic)),
            ViewEvent::SelectAssignee(name) => self.toggle_selection(Selection::Assignee(name)),
            ViewEvent::ClearSelection => self.selection = None,
            ViewEvent::ShowPage(page) => {
                if page != self.page {
                    self.page = page;
                    self.selection = None;
                }
            }
            ViewEvent::ToggleCompact => self.compact = !self.compact,
        }
        self.filter != before
    }

    fn toggle_selection(&mut self, selection: Selection) {
        if self.selection.as_ref() == Some(&selection) {
            self.selection = None;
        } else {
            self.selection = Some(selection);
        }
    }

    /// The selection that applies on the current page, if any.
    pub fn active_selection(&self) -> Option<&Selection> {
        match (self.page, self.selection.as_ref()) {
            (Page::Topics, Some(s @ Selection::Topic(_))) => Some(s),
            (Page::Assignees, Some(s @ Selection::Assignee(_))) => Some(s),
            _ => None,
        }
    }

    fn selection_matches(&self, task: &Task, topic_match: TopicMatch) -> bool {
        match self.active_selection() {
            None => true,
            Some(Selection::Topic(topic)) => topic_matches(&task.primary_topic, topic, topic_match),
            Some(Selection::Assignee(name)) => assignee_matches(task, name),
        }
    }

    /// Restore the filter from a URL query string; other state is kept.
    pub fn with_query(mut self, query: &str) -> Self {
        self.filter = filter_from_query(query);
        self
    }

    pub fn to_query(&self) -> String {
        filter_to_query(&self.filter)
    }
}

/// Parse `status`, `topic`, `assignee`, `priority` and `search` (or `q`) from a
/// query string. Unknown enum values are dropped; a repeated key keeps its last value.
pub fn filter_from_query(query: &str) -> TaskFilter {
    let query = query.trim_start_matches('?');
    let mut filter = TaskFilter::default();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim().to_string();
        match key.as_ref() {
            "status" => filter.status = parse_or_drop("status", &value),
            "priority" => filter.priority = parse_or_drop("priority", &value),
            "topic" => filter.topic = Some(value).filter(|v| !v.is_empty()),
            "assignee" => filter.assignee = Some(value).filter(|v| !v.is_empty()),
            "search" | "q" => filter.search = Some(value).filter(|v| !v.is_empty()),
            other => tracing::debug!(key = other, "ignoring query parameter"),
        }
    }
    filter
}

fn parse_or_drop<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!(key, value, "ignoring unknown query value");
            None
        }
    }
}

/// Serialize the active filter fields in a fixed key order.
pub fn filter_to_query(filter: &TaskFilter) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());
    if let Some(s) = filter.status {
        out.append_pair("status", s.as_str());
    }
    if let Some(t) = filter.topic.as_deref().filter(|t| !t.is_empty()) {
        out.append_pair("topic", t);
    }
    if let Some(a) = filter.assignee.as_deref().filter(|a| !a.is_empty()) {
        out.append_pair("assignee", a);
    }
    if let Some(p) = filter.priority {
        out.append_pair("priority", p.as_str());
    }
    if let Some(q) = filter.search.as_deref().filter(|q| !q.is_empty()) {
        out.append_pair("search", q);
    }
    out.finish()
}

/// Render-ready output of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskView<'a> {
    pub groups: Vec<TaskGroup<'a>>,
    /// Tasks surviving filter and selection.
    pub visible: usize,
    /// Size of the snapshot.
    pub total: usize,
    pub compact: bool,
}

/// One display row of a grouped view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewRow<'v, 'a> {
    Header { label: &'v str, count: usize },
    Task(&'a Task),
}

impl<'a> TaskView<'a> {
    /// Flatten to rows. Headers are omitted when there is only the "All Tasks" bucket.
    pub fn rows(&self) -> Vec<ViewRow<'_, 'a>> {
        let headed = self.groups.len() > 1 || self.groups.iter().any(|g| g.label != crate::group::ALL_TASKS);
        let mut rows = Vec::with_capacity(self.visible + self.groups.len());
        for group in &self.groups {
            if headed {
                rows.push(ViewRow::Header { label: group.label.as_str(), count: group.tasks.len() });
            }
            rows.extend(group.tasks.iter().map(|&t| ViewRow::Task(t)));
        }
        rows
    }
}

/// Run Filter → Sort → Group over `tasks` for `state`.
pub fn compose<'a>(tasks: &'a [Task], state: &ViewState, topic_match: TopicMatch) -> TaskView<'a> {
    let filtered: Vec<&Task> = filter_tasks(tasks, &state.filter, topic_match)
        .into_iter()
        .filter(|t| state.selection_matches(t, topic_match))
        .collect();
    let visible = filtered.len();
    let sorted = sort_tasks(filtered, state.sort_by);
    TaskView {
        groups: group_tasks(sorted, state.group_by),
        visible,
        total: tasks.len(),
        compact: state.compact,
    }
}

/// Settings the dashboard needs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSettings {
    pub topic_match: TopicMatch,
    pub stats: StatsSettings,
}

/// Snapshot + view state + inline error.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    tasks: Vec<Task>,
    state: ViewState,
    settings: ViewSettings,
    query: String,
    error: Option<String>,
}

impl Dashboard {
    pub fn new(state: ViewState, settings: ViewSettings) -> Self {
        let query = state.to_query();
        Dashboard { tasks: Vec::new(), state, settings, query, error: None }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The query string mirroring the current filter.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Apply an event; the mirrored query is rewritten whenever the filter changes.
    pub fn dispatch(&mut self, event: ViewEvent) {
        if self.state.apply(event) {
            self.query = self.state.to_query();
        }
    }

    /// Accept a fetched snapshot, or keep the previous one and record the failure.
    pub fn load(&mut self, fetched: Result<Vec<Task>>) {
        match fetched {
            Ok(tasks) => {
                self.tasks = tasks;
                self.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "task fetch failed, keeping last snapshot");
                self.error = Some(format!("Failed to load tasks: {e}"));
            }
        }
    }

    pub fn refresh(&mut self, api: &dyn TaskApi) {
        self.load(api.snapshot());
    }

    /// Run a mutation against the API and re-fetch on success.
    pub fn mutate<T, F>(&mut self, api: &mut dyn TaskApi, action: F) -> Option<T>
    where
        F: FnOnce(&mut dyn TaskApi) -> Result<T>,
    {
        match action(&mut *api) {
            Ok(value) => {
                self.refresh(api);
                Some(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, "task mutation failed");
                self.error = Some(format!("Update failed: {e}"));
                None
            }
        }
    }

    pub fn view(&self) -> TaskView<'_> {
        compose(&self.tasks, &self.state, self.settings.topic_match)
    }

    /// Topic tree over the tasks passing the general filter.
    pub fn topic_tree(&self) -> TopicNode<'_> {
        build_topic_tree(filter_tasks(&self.tasks, &self.state.filter, self.settings.topic_match))
    }

    /// Statistics over the whole snapshot.
    pub fn stats(&self, today: NaiveDate) -> TaskStats<'_> {
        let all: Vec<&Task> = self.tasks.iter().collect();
        compute_stats(&all, today, self.settings.stats)
    }
}
