//! Data directory resolution and dashboard settings.
//!
//! Tasks live in `<data dir>/tasks.json` unless `--db` points elsewhere. Settings
//! are read from `<data dir>/config.json`; every field has a default so a partial
//! file is fine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::*;
use crate::stats::StatsSettings;

pub const DIR_ENV: &str = "TASKBOARD_DIR";
pub const CONFIG_FILE: &str = "config.json";
pub const TASKS_FILE: &str = "tasks.json";

/// Upper bound for the due-soon window, ten years.
pub const MAX_DUE_SOON_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub due_soon_days: i64,
    pub urgent_limit: usize,
    pub recent_limit: usize,
    pub topic_match: TopicMatch,
    pub default_group: GroupBy,
    pub default_sort: SortKey,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        let stats = StatsSettings::default();
        Config {
            due_soon_days: stats.due_soon_days,
            urgent_limit: stats.urgent_limit,
            recent_limit: stats.recent_limit,
            topic_match: TopicMatch::Prefix,
            default_group: GroupBy::None,
            default_sort: SortKey::Created,
            page_size: 100,
        }
    }
}

impl Config {
    /// Read settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        if !(0..=MAX_DUE_SOON_DAYS).contains(&config.due_soon_days) {
            return Err(Error::Config(format!(
                "{}: due_soon_days must be between 0 and {MAX_DUE_SOON_DAYS}",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Like [`Config::load`], but falls back to defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "using default settings");
                Config::default()
            }
        }
    }

    pub fn stats_settings(&self) -> StatsSettings {
        StatsSettings {
            due_soon_days: self.due_soon_days,
            urgent_limit: self.urgent_limit,
            recent_limit: self.recent_limit,
        }
    }
}

/// Pick the data directory: explicit flag, then `TASKBOARD_DIR`, then `$HOME/.taskboard`.
pub fn data_dir_from(flag: Option<&Path>, env_dir: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env_dir.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    let home = home.unwrap_or_else(|| ".".to_string());
    PathBuf::from(home).join(".taskboard")
}

/// Resolve and create the data directory.
pub fn resolve_data_dir(flag: Option<&Path>) -> Result<PathBuf> {
    let dir = data_dir_from(flag, std::env::var(DIR_ENV).ok(), std::env::var("HOME").ok());
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn resolve_db_path(db_flag: Option<&Path>, data_dir: &Path) -> PathBuf {
    db_flag.map(Path::to_path_buf).unwrap_or_else(|| data_dir.join(TASKS_FILE))
}
