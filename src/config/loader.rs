// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{AppConfig, RawAppConfig};
use crate::errors::{Result, TaskgateError};
use crate::path_utils::normalize;
use crate::task::Task;

/// Default file name of an application config.
pub const APP_CONFIG_FILE: &str = ".app.toml";

/// Deserialize an application config from a string. No validation.
pub fn load_from_str(contents: &str) -> Result<RawAppConfig> {
    Ok(toml::from_str(contents)?)
}

/// Load an application config from a given path. No validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawAppConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(TaskgateError::file_io(path))?;
    load_from_str(&contents)
}

/// Load and validate the application config at `path` and return its tasks.
///
/// Task directories are the directory of the config file; each task gets the
/// config file as its implicit input. The path is made absolute against the
/// current directory if needed.
pub fn load_app(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = absolute(path.as_ref())?;
    let raw = load_from_path(&path)?;
    let app = AppConfig::try_from(raw)?;
    let tasks = app.into_tasks(&path);
    debug!(config = ?path, tasks = tasks.len(), "loaded application config");
    Ok(tasks)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    Ok(normalize(&std::env::current_dir()?.join(path)))
}
