//! Tracing setup.
//!
//! CLI commands log human-readable lines to stderr. The dashboard owns the terminal,
//! so it logs JSON lines to a daily rolling file under the data directory instead.

use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Checked before `RUST_LOG`.
pub const LOG_ENV: &str = "TASKBOARD_LOG";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr, `warn` and above unless the environment says otherwise.
pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Log to `<data dir>/logs/taskboard.log.<date>`.
pub fn init_file(data_dir: &Path) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "taskboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|e| Error::Config(format!("logging: {e}")))
}
