// src/vcs/mod.rs

//! Git integration.
//!
//! - [`Git`] is a thin wrapper around `git` subprocess calls.
//! - [`listing`] parses the NUL-delimited `git ls-files` output.
//! - [`TrackedObjects`] is the lazily-built path → object id index used by
//!   the fast hashing path.

pub mod listing;
pub mod tracked;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, instrument};

use crate::errors::{Result, TaskgateError};

pub use listing::{EntryStatus, ListingRecord};
pub use tracked::{ObjectMode, TrackedObject, TrackedObjects};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if a `git` binary can be executed.
    pub fn is_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Root directory of the repository containing `dir`.
    pub fn toplevel(dir: &Path) -> Result<PathBuf> {
        let out = Git::new(dir).run_checked(&["rev-parse", "--show-toplevel"])?;
        let root = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if root.is_empty() {
            return Err(TaskgateError::Command {
                command: "git rev-parse --show-toplevel".to_string(),
                message: format!("no repository found for {dir:?}"),
            });
        }
        Ok(PathBuf::from(root))
    }

    /// Absolute paths of all files recorded in the index.
    ///
    /// `workdir` must be the repository root.
    #[instrument(skip_all, fields(root = ?self.workdir))]
    pub fn tracked_files(&self) -> Result<HashSet<PathBuf>> {
        let out = self.run_checked(&["-c", "core.quotepath=off", "ls-files", "-z", "--full-name"])?;
        let files: HashSet<PathBuf> = out
            .stdout
            .split(|b| *b == 0)
            .filter(|entry| !entry.is_empty())
            .map(|entry| self.workdir.join(listing::path_from_bytes(entry)))
            .collect();
        debug!(count = files.len(), "listed tracked files");
        Ok(files)
    }

    /// Object id git would assign to the current content of `path`,
    /// independent of the index state.
    pub fn hash_object(&self, path: &Path) -> Result<String> {
        let path = path.to_string_lossy();
        let out = self.run_checked(&["hash-object", "--", &path])?;
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    pub(crate) fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.workdir).args(args);
        cmd
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let out = self.command(args).output().map_err(|e| TaskgateError::Command {
            command: format!("git {}", args.join(" ")),
            message: e.to_string(),
        })?;
        if !out.status.success() {
            return Err(TaskgateError::Command {
                command: format!("git {}", args.join(" ")),
                message: format!(
                    "exit status {}: {}",
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
            });
        }
        Ok(out)
    }
}
