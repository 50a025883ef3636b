//! Dashboard TUI entry point and terminal setup.

use std::io;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::error::Result;
use crate::store::TaskStore;
use crate::tui::app::App;
use crate::view::ViewState;

/// Initialise the terminal, run the dashboard until the user quits, and restore
/// the terminal even when the event loop failed.
pub fn run_dashboard(store: TaskStore, config: &Config, state: ViewState) -> Result<()> {
    tracing::info!(path = %store.path().display(), "starting dashboard");
    let mut app = App::new(store, config, state);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "dashboard event loop failed");
    }
    result?;
    tracing::info!("dashboard closed");
    Ok(())
}
