//! Enumerations for TUI state management.

/// Which screen the dashboard is showing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppState {
    Dashboard,
    Help,
}

/// Input mode for text entry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputMode {
    None,
    Search,
}

/// Pane that receives navigation keys on the Topics and Assignees pages.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Focus {
    Side,
    Tasks,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Side => Focus::Tasks,
            Focus::Tasks => Focus::Side,
        }
    }
}
