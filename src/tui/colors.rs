//! Color constants for the terminal user interface.

use ratatui::style::{Color, Modifier, Style};

use crate::fields::{Priority, Status};
use crate::stats::DueState;

/// Header and status bar background.
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);
/// High priority.
pub const DARK_RED: Color = Color::Rgb(178, 34, 34);
/// Medium priority, due soon.
pub const GOLD: Color = Color::Rgb(255, 215, 0);
/// Low priority.
pub const DARK_GREEN: Color = Color::Rgb(46, 139, 87);
/// Group header rows.
pub const SLATE: Color = Color::Rgb(47, 54, 64);

pub fn priority_color(p: Priority) -> Color {
    match p {
        Priority::High => DARK_RED,
        Priority::Medium => GOLD,
        Priority::Low => DARK_GREEN,
    }
}

/// Row style for a task in the given status.
pub fn status_style(s: Status) -> Style {
    match s {
        Status::Completed => Style::default().fg(Color::DarkGray),
        Status::InProgress => Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        Status::Pending => Style::default().fg(Color::White),
    }
}

pub fn due_color(state: DueState) -> Color {
    match state {
        DueState::Overdue => Color::Red,
        DueState::DueSoon => GOLD,
        DueState::Scheduled | DueState::Unscheduled => Color::White,
        DueState::Done => Color::DarkGray,
    }
}
