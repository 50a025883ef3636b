//! Main application logic for the terminal dashboard.
//!
//! `App` owns the task store and a [`Dashboard`]; key presses become
//! [`ViewEvent`]s or store mutations, and every frame is rendered from the
//! dashboard's current snapshot. Failures never leave the dashboard: they show
//! up in the status bar while the last good view stays on screen.

use std::collections::HashSet;
use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::config::Config;
use crate::display::{due_marker, format_due_relative, short_id};
use crate::fields::*;
use crate::stats::{due_state, AssigneeRollup};
use crate::store::{TaskApi, TaskStore};
use crate::task::Task;
use crate::tui::{
    colors::{due_color, priority_color, status_style, DARK_PURPLE, SLATE},
    enums::{AppState, Focus, InputMode},
    input::InputField,
};
use crate::view::{Dashboard, Page, Selection, ViewEvent, ViewRow, ViewSettings, ViewState};

/// One navigable line of the Topics or Assignees side pane.
#[derive(Debug, Clone, PartialEq)]
struct SideEntry {
    /// Topic path or assignee name passed on selection.
    key: String,
    label: String,
    count: usize,
    expandable: bool,
}

/// Next value in `all` after `current`, wrapping through "no value".
fn cycle_option<T: Copy + PartialEq>(current: Option<T>, all: &[T]) -> Option<T> {
    match current {
        None => all.first().copied(),
        Some(c) => all
            .iter()
            .position(|&v| v == c)
            .and_then(|i| all.get(i + 1))
            .copied(),
    }
}

/// Move from `current` to the next task row, skipping group headers.
fn step_to_task(is_task: &[bool], current: Option<usize>, down: bool) -> Option<usize> {
    let first = is_task.iter().position(|&t| t);
    let Some(mut i) = current.filter(|&i| i < is_task.len()) else {
        return first;
    };
    loop {
        i = if down {
            i + 1
        } else {
            match i.checked_sub(1) {
                Some(j) => j,
                None => return current,
            }
        };
        match is_task.get(i) {
            None => return current,
            Some(true) => return Some(i),
            Some(false) => continue,
        }
    }
}

pub struct App {
    store: TaskStore,
    dashboard: Dashboard,
    state: AppState,
    input_mode: InputMode,
    search: InputField,
    focus: Focus,
    task_table: TableState,
    side_table: TableState,
    collapsed: HashSet<String>,
    status_message: String,
    due_soon_days: i64,
}

impl App {
    /// Build the dashboard and load the first snapshot from `store`.
    pub fn new(store: TaskStore, config: &Config, state: ViewState) -> Self {
        let settings = ViewSettings { topic_match: config.topic_match, stats: config.stats_settings() };
        let mut dashboard = Dashboard::new(state, settings);
        dashboard.refresh(&store);

        let mut app = App {
            store,
            dashboard,
            state: AppState::Dashboard,
            input_mode: InputMode::None,
            search: InputField::new(),
            focus: Focus::Tasks,
            task_table: TableState::default(),
            side_table: TableState::default(),
            collapsed: HashSet::new(),
            status_message: String::new(),
            due_soon_days: config.due_soon_days,
        };
        app.reset_task_selection();
        app
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn page(&self) -> Page {
        self.dashboard.state().page
    }

    fn selected_task(&self) -> Option<&Task> {
        let idx = self.task_table.selected()?;
        let view = self.dashboard.view();
        let rows = view.rows();
        match rows.get(idx) {
            Some(ViewRow::Task(t)) => Some(*t),
            _ => None,
        }
    }

    fn task_row_kinds(&self) -> Vec<bool> {
        self.dashboard
            .view()
            .rows()
            .iter()
            .map(|r| matches!(r, ViewRow::Task(_)))
            .collect()
    }

    fn reset_task_selection(&mut self) {
        let kinds = self.task_row_kinds();
        self.task_table.select(step_to_task(&kinds, None, true));
    }

    /// Keep the selection on a valid row after the row count changed.
    fn clamp_task_selection(&mut self) {
        let kinds = self.task_row_kinds();
        let current = self.task_table.selected().map(|i| i.min(kinds.len().saturating_sub(1)));
        let fixed = match current {
            Some(i) if kinds.get(i) == Some(&true) => Some(i),
            Some(i) => step_to_task(&kinds, Some(i), false)
                .filter(|&j| kinds[j])
                .or_else(|| step_to_task(&kinds, None, true)),
            None => step_to_task(&kinds, None, true),
        };
        self.task_table.select(fixed);
    }

    fn move_task_selection(&mut self, down: bool) {
        let kinds = self.task_row_kinds();
        self.task_table.select(step_to_task(&kinds, self.task_table.selected(), down));
    }

    fn topic_entries(&self) -> Vec<SideEntry> {
        let tree = self.dashboard.topic_tree();
        let entries = tree
            .flatten(|path| !self.collapsed.contains(path))
            .into_iter()
            .map(|line| {
                let node = line.node;
                let marker = if node.is_leaf() {
                    "  "
                } else if self.collapsed.contains(&node.full_path) {
                    "▸ "
                } else {
                    "▾ "
                };
                let name = if node.name.is_empty() { "(blank)" } else { node.name.as_str() };
                SideEntry {
                    key: node.full_path.clone(),
                    label: format!("{}{}{}", "  ".repeat(line.depth), marker, name),
                    count: node.task_count,
                    expandable: !node.is_leaf(),
                }
            })
            .collect();
        entries
    }

    fn assignee_rollups(&self) -> Vec<AssigneeRollup> {
        self.dashboard.stats(Self::today()).assignee_rollups
    }

    fn side_entries(&self) -> Vec<SideEntry> {
        match self.page() {
            Page::Tasks => Vec::new(),
            Page::Topics => self.topic_entries(),
            Page::Assignees => self
                .assignee_rollups()
                .into_iter()
                .map(|r| SideEntry { key: r.name.clone(), label: r.name, count: r.total, expandable: false })
                .collect(),
        }
    }

    fn move_side_selection(&mut self, down: bool) {
        let len = self.side_entries().len();
        if len == 0 {
            self.side_table.select(None);
            return;
        }
        let next = match self.side_table.selected() {
            None => 0,
            Some(i) if down => (i + 1).min(len - 1),
            Some(i) => i.saturating_sub(1),
        };
        self.side_table.select(Some(next));
    }

    fn selected_side_entry(&self) -> Option<SideEntry> {
        let idx = self.side_table.selected()?;
        self.side_entries().into_iter().nth(idx)
    }

    fn dispatch(&mut self, event: ViewEvent) {
        self.dashboard.dispatch(event);
        self.reset_task_selection();
    }

    fn show_page(&mut self, page: Page) {
        self.dispatch(ViewEvent::ShowPage(page));
        self.focus = if page == Page::Tasks { Focus::Tasks } else { Focus::Side };
        let has_entries = !self.side_entries().is_empty();
        self.side_table.select(has_entries.then_some(0));
    }

    fn toggle_selected_completion(&mut self) {
        let Some((id, completed)) = self.selected_task().map(|t| (t.id.clone(), t.is_completed())) else {
            self.status_message = "No task selected".into();
            return;
        };
        let result = if completed {
            self.dashboard.mutate(&mut self.store, |api: &mut dyn TaskApi| api.reopen_task(&id))
        } else {
            self.dashboard.mutate(&mut self.store, |api: &mut dyn TaskApi| api.complete_task(&id))
        };
        if let Some(task) = result {
            let verb = if task.is_completed() { "Completed" } else { "Reopened" };
            self.status_message = format!("{verb} {}", short_id(&task.id));
        }
        self.clamp_task_selection();
    }

    fn reload(&mut self) {
        let fetched = self.store.reload().and_then(|()| self.store.snapshot());
        let ok = fetched.is_ok();
        self.dashboard.load(fetched);
        if ok {
            self.status_message = format!("Reloaded {} task(s)", self.dashboard.tasks().len());
        }
        self.clamp_task_selection();
    }

    /// Esc peels back one layer: selection, then search, then remaining filters.
    fn clear_one_layer(&mut self) {
        let state = self.dashboard.state();
        if state.active_selection().is_some() {
            self.dispatch(ViewEvent::ClearSelection);
        } else if state.filter.search.is_some() {
            self.dispatch(ViewEvent::SetSearch(None));
        } else if !state.filter.is_empty() {
            self.dispatch(ViewEvent::ClearFilters);
        } else {
            self.dashboard.clear_error();
        }
    }

    fn handle_search_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Enter => self.input_mode = InputMode::None,
            KeyCode::Esc => {
                self.search.clear();
                self.input_mode = InputMode::None;
                self.dispatch(ViewEvent::SetSearch(None));
            }
            KeyCode::Char(c) => {
                self.search.handle_char(c);
                self.dispatch(ViewEvent::SetSearch(Some(self.search.value().to_string())));
            }
            KeyCode::Backspace => {
                self.search.handle_backspace();
                self.dispatch(ViewEvent::SetSearch(Some(self.search.value().to_string())));
            }
            KeyCode::Delete => {
                self.search.handle_delete();
                self.dispatch(ViewEvent::SetSearch(Some(self.search.value().to_string())));
            }
            KeyCode::Left => self.search.move_cursor_left(),
            KeyCode::Right => self.search.move_cursor_right(),
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let side_focused = self.page() != Page::Tasks && self.focus == Focus::Side;
        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            KeyCode::Tab => self.show_page(self.page().next()),
            KeyCode::Left | KeyCode::Right if self.page() != Page::Tasks => self.focus = self.focus.toggle(),
            KeyCode::Up | KeyCode::Char('k') => {
                if side_focused {
                    self.move_side_selection(false);
                } else {
                    self.move_task_selection(false);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if side_focused {
                    self.move_side_selection(true);
                } else {
                    self.move_task_selection(true);
                }
            }
            KeyCode::Enter if side_focused => {
                if let Some(entry) = self.selected_side_entry() {
                    match self.page() {
                        Page::Topics => self.dispatch(ViewEvent::SelectTopic(entry.key)),
                        Page::Assignees => self.dispatch(ViewEvent::SelectAssignee(entry.key)),
                        Page::Tasks => {}
                    }
                }
            }
            KeyCode::Char(' ') if side_focused && self.page() == Page::Topics => {
                if let Some(entry) = self.selected_side_entry().filter(|e| e.expandable) {
                    if !self.collapsed.remove(&entry.key) {
                        self.collapsed.insert(entry.key);
                    }
                }
            }
            KeyCode::Char('g') => self.dispatch(ViewEvent::CycleGroup),
            KeyCode::Char(d @ '1'..='4') => {
                let key = match d {
                    '1' => GroupBy::Topic,
                    '2' => GroupBy::Assignee,
                    '3' => GroupBy::Priority,
                    _ => GroupBy::Status,
                };
                self.dispatch(ViewEvent::ToggleGroup(key));
            }
            KeyCode::Char('s') => self.dispatch(ViewEvent::CycleSort),
            KeyCode::Char('f') => {
                let next = cycle_option(self.dashboard.state().filter.status, &Status::ALL);
                self.dispatch(ViewEvent::SetStatus(next));
            }
            KeyCode::Char('p') => {
                let next = cycle_option(self.dashboard.state().filter.priority, &Priority::ALL);
                self.dispatch(ViewEvent::SetPriority(next));
            }
            KeyCode::Char('c') => self.dispatch(ViewEvent::ToggleCompact),
            KeyCode::Char('/') => {
                let current = self.dashboard.state().filter.search.clone().unwrap_or_default();
                self.search = InputField::with_value(&current);
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char('x') => self.toggle_selected_completion(),
            KeyCode::Char('r') => self.reload(),
            KeyCode::Esc => self.clear_one_layer(),
            _ => {}
        }
        false
    }

    /// Handle one key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        match self.state {
            AppState::Help => {
                self.state = AppState::Dashboard;
                false
            }
            AppState::Dashboard => match self.input_mode {
                InputMode::Search => {
                    self.handle_search_key(key);
                    false
                }
                InputMode::None => self.handle_dashboard_key(key, modifiers),
            },
        }
    }

    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    /// Render the title line, page tabs and headline stats.
    fn render_header(&mut self, f: &mut Frame, area: Rect) {
        let stats = self.dashboard.stats(Self::today());
        let mut tabs = vec![
            Span::styled("TASKBOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("   "),
        ];
        for page in [Page::Tasks, Page::Topics, Page::Assignees] {
            let style = if page == self.page() {
                Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            tabs.push(Span::styled(format!(" {} ", page.label()), style));
            tabs.push(Span::raw(" "));
        }

        let counts = Line::from(vec![
            Span::raw(format!("Total {}  ", stats.total)),
            Span::raw(format!("Pending {}  ", stats.status_count(Status::Pending))),
            Span::raw(format!("In Progress {}  ", stats.status_count(Status::InProgress))),
            Span::raw(format!("Completed {}  ", stats.status_count(Status::Completed))),
            Span::styled(format!("Overdue {}  ", stats.overdue_count), Style::default().fg(Color::Red)),
            Span::styled(format!("Due soon {}  ", stats.due_soon_count), Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{}% done", stats.completion_percent()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ]);

        let header = Paragraph::new(vec![Line::from(tabs), counts])
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn task_row<'r>(&self, t: &'r Task, today: NaiveDate, compact: bool) -> Row<'r> {
        let due = due_state(t, today, self.due_soon_days);
        let due_text = format!("{}{}", format_due_relative(t.deadline, today), due_marker(due));
        let mut cells = vec![
            Cell::from(short_id(&t.id)),
            Cell::from(t.status.label()),
            Cell::from(t.priority.label()).style(Style::default().fg(priority_color(t.priority))),
            Cell::from(due_text).style(Style::default().fg(due_color(due))),
            Cell::from(t.assignee_label()),
        ];
        if compact {
            cells.push(Cell::from(t.description.as_str()));
        } else {
            cells.push(Cell::from(t.primary_topic.as_str()));
            let text = match t.context.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(ctx) => format!("{} · {}", t.description, ctx),
                None => t.description.clone(),
            };
            cells.push(Cell::from(text));
        }
        Row::new(cells).style(status_style(t.status))
    }

    /// Render the grouped task table.
    fn render_task_table(&mut self, f: &mut Frame, area: Rect, focused: bool) {
        let today = Self::today();
        let view = self.dashboard.view();
        let state = self.dashboard.state();
        let title = format!(
            "Tasks ({}/{}) | group: {} | sort: {}",
            view.visible,
            view.total,
            state.group_by.label(),
            state.sort_by.label()
        );
        let border = if focused { Style::default().fg(Color::Cyan) } else { Style::default() };
        let block = Block::default().borders(Borders::ALL).border_style(border).title(title);

        if view.visible == 0 {
            let message = if self.dashboard.tasks().is_empty() {
                "No tasks yet. Add one with `tb add` or import a consolidated file."
            } else {
                "No tasks match the current filters. Press Esc to clear."
            };
            let empty = Paragraph::new(message).block(block).alignment(Alignment::Center);
            f.render_widget(empty, area);
            return;
        }

        let mut header_labels = vec!["ID", "Status", "Pri", "Due", "Assignee"];
        let mut widths = vec![
            Constraint::Length(12),
            Constraint::Length(11),
            Constraint::Length(6),
            Constraint::Length(11),
            Constraint::Length(14),
        ];
        if !view.compact {
            header_labels.push("Topic");
            widths.push(Constraint::Length(22));
        }
        header_labels.push("Description");
        widths.push(Constraint::Min(20));

        let header = Row::new(
            header_labels
                .into_iter()
                .map(|h| Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))),
        )
        .style(Style::default().bg(DARK_PURPLE).fg(Color::White))
        .height(1);

        let rows: Vec<Row> = view
            .rows()
            .into_iter()
            .map(|row| match row {
                ViewRow::Header { label, count } => {
                    let label = if label.is_empty() { "(blank)" } else { label };
                    Row::new(vec![Cell::from(format!("▸ {label} ({count})"))])
                        .style(Style::default().bg(SLATE).fg(Color::White).add_modifier(Modifier::BOLD))
                }
                ViewRow::Task(t) => self.task_row(t, today, view.compact),
            })
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.task_table);
    }

    /// Render the topic tree pane.
    fn render_topics(&mut self, f: &mut Frame, area: Rect, focused: bool) {
        let entries = self.topic_entries();
        let selected = match self.dashboard.state().active_selection() {
            Some(Selection::Topic(t)) => Some(t.clone()),
            _ => None,
        };
        let rows: Vec<Row> = entries
            .iter()
            .map(|e| {
                let style = if selected.as_deref() == Some(e.key.as_str()) {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Row::new(vec![Cell::from(e.label.clone()), Cell::from(e.count.to_string())]).style(style)
            })
            .collect();
        let border = if focused { Style::default().fg(Color::Cyan) } else { Style::default() };
        let table = Table::new(rows, [Constraint::Min(10), Constraint::Length(5)])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title("Topics (Enter select, Space fold)"),
            )
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black));
        f.render_stateful_widget(table, area, &mut self.side_table);
    }

    /// Render the assignee rollup pane.
    fn render_assignees(&mut self, f: &mut Frame, area: Rect, focused: bool) {
        let rollups = self.assignee_rollups();
        let selected = match self.dashboard.state().active_selection() {
            Some(Selection::Assignee(a)) => Some(a.clone()),
            _ => None,
        };
        let header = Row::new(["Assignee", "All", "H", "M", "L", "Open", "Done"])
            .style(Style::default().bg(DARK_PURPLE).fg(Color::White).add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = rollups
            .iter()
            .map(|r| {
                let mut style = Style::default();
                if r.is_unassigned() {
                    style = style.fg(Color::DarkGray);
                }
                if selected.as_deref() == Some(r.name.as_str()) {
                    style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
                }
                Row::new(vec![
                    Cell::from(r.name.clone()),
                    Cell::from(r.total.to_string()),
                    Cell::from(r.priority_count(Priority::High).to_string()),
                    Cell::from(r.priority_count(Priority::Medium).to_string()),
                    Cell::from(r.priority_count(Priority::Low).to_string()),
                    Cell::from(r.pending.to_string()),
                    Cell::from(r.completed.to_string()),
                ])
                .style(style)
            })
            .collect();
        let widths = [
            Constraint::Min(12),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(5),
        ];
        let border = if focused { Style::default().fg(Color::Cyan) } else { Style::default() };
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).border_style(border).title("Assignees (Enter select)"))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black));
        f.render_stateful_widget(table, area, &mut self.side_table);
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(vec![Span::styled("Taskboard Help", bold)]),
            Line::from(""),
            Line::from(vec![Span::styled("Navigation:", bold)]),
            Line::from("  Tab          Next page (Tasks, Topics, Assignees)"),
            Line::from("  ↑/k, ↓/j     Move selection"),
            Line::from("  ←/→          Switch pane on Topics and Assignees"),
            Line::from("  Enter        Select topic or assignee (again to clear)"),
            Line::from("  Space        Fold or unfold a topic"),
            Line::from(""),
            Line::from(vec![Span::styled("View:", bold)]),
            Line::from("  g            Cycle grouping"),
            Line::from("  1-4          Group by topic, assignee, priority, status (again to ungroup)"),
            Line::from("  s            Cycle sort key"),
            Line::from("  f            Cycle status filter"),
            Line::from("  p            Cycle priority filter"),
            Line::from("  /            Search description, topic and assignee"),
            Line::from("  c            Toggle compact rows"),
            Line::from("  Esc          Clear selection, then search, then filters"),
            Line::from(""),
            Line::from(vec![Span::styled("Tasks:", bold)]),
            Line::from("  x            Complete or reopen selected task"),
            Line::from("  r            Reload from disk"),
            Line::from("  h/F1         Show this help"),
            Line::from("  q/Ctrl+C     Quit"),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let bar = Style::default().bg(DARK_PURPLE).fg(Color::White);
        let (text, style) = if self.input_mode == InputMode::Search {
            let prefix = "Search: ";
            let cursor_x = area.x + (prefix.len() + self.search.cursor()) as u16;
            f.set_cursor_position(Position::new(cursor_x.min(area.right().saturating_sub(1)), area.y));
            (format!("{prefix}{}  (Enter keep, Esc clear)", self.search.value()), bar)
        } else if let Some(err) = self.dashboard.error() {
            (format!("{err} | r to retry, Esc to dismiss"), Style::default().bg(Color::Red).fg(Color::White))
        } else if !self.status_message.is_empty() {
            (self.status_message.clone(), bar)
        } else {
            let query = self.dashboard.query();
            let filter = match self.dashboard.state().filter.active_count() {
                0 => "no filters".to_string(),
                1 => format!("1 filter ?{query}"),
                n => format!("{n} filters ?{query}"),
            };
            let selection = match self.dashboard.state().active_selection() {
                Some(Selection::Topic(t)) => format!(" | topic: {t}"),
                Some(Selection::Assignee(a)) => format!(" | assignee: {a}"),
                None => String::new(),
            };
            (format!("{filter}{selection} | Press 'h' for help"), bar)
        };
        f.render_widget(Paragraph::new(text).style(style), area);
    }

    /// Main render function that lays out header, body and status bar.
    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        self.render_header(f, chunks[0]);
        match (self.state, self.page()) {
            (AppState::Help, _) => self.render_help(f, chunks[1]),
            (AppState::Dashboard, Page::Tasks) => self.render_task_table(f, chunks[1], true),
            (AppState::Dashboard, page) => {
                let panes = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
                    .split(chunks[1]);
                let side_focused = self.focus == Focus::Side;
                if page == Page::Topics {
                    self.render_topics(f, panes[0], side_focused);
                } else {
                    self.render_assignees(f, panes[0], side_focused);
                }
                self.render_task_table(f, panes[1], !side_focused);
            }
        }
        self.render_status_bar(f, chunks[2]);
    }

    /// Main event loop: draw, then handle input until the user quits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use pretty_assertions::assert_eq;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    fn app() -> (TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TaskStore::open(&dir.path().join("tasks.json"), TopicMatch::Prefix).unwrap();
        for (desc, topic, assignee, priority) in [
            ("Draft budget", "Work/Finance", Some("Ana"), Priority::High),
            ("Plant tulips", "Home/Garden", None, Priority::Low),
            ("Review slides", "Work/Events", Some("Ben"), Priority::Medium),
        ] {
            store
                .create_task(NewTask {
                    description: desc.into(),
                    primary_topic: Some(topic.into()),
                    assignee: assignee.map(String::from),
                    priority: Some(priority),
                    ..NewTask::default()
                })
                .unwrap();
        }
        let app = App::new(store, &Config::default(), ViewState::default());
        (dir, app)
    }

    fn press(app: &mut App, keys: &str) {
        for c in keys.chars() {
            app.handle_key(KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn cycling_helpers() {
        assert_eq!(cycle_option(None, &Status::ALL), Some(Status::Pending));
        assert_eq!(cycle_option(Some(Status::Completed), &Status::ALL), None);
        let kinds = [false, true, true, false, true];
        assert_eq!(step_to_task(&kinds, None, true), Some(1));
        assert_eq!(step_to_task(&kinds, Some(2), true), Some(4));
        assert_eq!(step_to_task(&kinds, Some(4), true), Some(4));
        assert_eq!(step_to_task(&kinds, Some(1), false), Some(1));
        assert_eq!(step_to_task(&[], None, true), None);
    }

    #[test]
    fn filter_keys_update_the_mirrored_query() {
        let (_dir, mut app) = app();
        press(&mut app, "fp");
        assert_eq!(app.dashboard().query(), "status=pending&priority=high");
        assert_eq!(app.dashboard().view().visible, 1);
        press(&mut app, "g");
        assert_eq!(app.dashboard().state().group_by, GroupBy::Topic);
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.dashboard().query(), "");
    }

    #[test]
    fn number_keys_toggle_grouping_and_status_bar_counts_filters() {
        let (_dir, mut app) = app();
        press(&mut app, "2");
        assert_eq!(app.dashboard().state().group_by, GroupBy::Assignee);
        press(&mut app, "2");
        assert_eq!(app.dashboard().state().group_by, GroupBy::None);
        press(&mut app, "4");
        assert_eq!(app.dashboard().state().group_by, GroupBy::Status);

        assert!(screen(&mut app).contains("no filters"));
        press(&mut app, "fp");
        assert!(screen(&mut app).contains("2 filters ?status=pending&priority=high"));
    }

    #[test]
    fn search_mode_filters_live() {
        let (_dir, mut app) = app();
        press(&mut app, "/tul");
        assert_eq!(app.dashboard().state().filter.search.as_deref(), Some("tul"));
        assert_eq!(app.dashboard().view().visible, 1);
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        app.handle_key(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(app.dashboard().state().filter.search, None);
    }

    #[test]
    fn complete_and_reopen_selected_task() {
        let (_dir, mut app) = app();
        let id = app.selected_task().unwrap().id.clone();
        press(&mut app, "x");
        let task = app.dashboard().tasks().iter().find(|t| t.id == id).unwrap();
        assert_eq!(task.status, Status::Completed);
        press(&mut app, "x");
        let task = app.dashboard().tasks().iter().find(|t| t.id == id).unwrap();
        assert_eq!(task.status, Status::Pending);
    }

    #[test]
    fn selecting_a_topic_narrows_the_task_pane() {
        let (_dir, mut app) = app();
        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.dashboard().state().page, Page::Topics);
        // First tree row is "Home"
        app.handle_key(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(app.dashboard().state().selection, Some(Selection::Topic("Home".into())));
        assert_eq!(app.dashboard().view().visible, 1);
        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(app.dashboard().state().selection, None);
        assert_eq!(app.dashboard().view().visible, 3);
    }

    #[test]
    fn renders_every_page() {
        let (_dir, mut app) = app();
        let text = screen(&mut app);
        assert!(text.contains("TASKBOARD"));
        assert!(text.contains("Draft budget"));
        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert!(screen(&mut app).contains("Topics"));
        app.handle_key(KeyCode::Tab, KeyModifiers::NONE);
        assert!(screen(&mut app).contains("Unassigned"));
        press(&mut app, "h");
        assert!(screen(&mut app).contains("Taskboard Help"));
    }
}
