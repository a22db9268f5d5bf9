// src/lib.rs

pub mod config;
pub mod digest;
pub mod errors;
pub mod fs;
pub mod inputs;
pub mod logging;
pub mod path_utils;
pub mod resolve;
pub mod status;
pub mod task;
pub mod vcs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

pub use crate::digest::{Algorithm, Digest};
pub use crate::errors::{Result, TaskgateError};
pub use crate::inputs::{File, Input, InputResolver, Inputs};
pub use crate::status::{Evaluation, MemoryRunStore, Run, RunStore, TaskStatus, TaskStatusEvaluator};
pub use crate::task::Task;

use crate::digest::{ContentHasher, TrackedObjectHasher};
use crate::fs::RealFileSystem;
use crate::resolve::GoListCommand;
use crate::vcs::TrackedObjects;

/// Wire up a [`TaskStatusEvaluator`] for the git repository at `repo_root`.
///
/// File digests come from the git index where possible (one `git ls-files`
/// scan, shared by all tasks evaluated through the returned evaluator), and
/// from file contents otherwise. Go source queries run the `go` tool.
pub fn evaluator_for_repository(
    repo_root: impl Into<PathBuf>,
    store: Arc<dyn RunStore>,
) -> TaskStatusEvaluator {
    let repo_root = repo_root.into();
    let fs = Arc::new(RealFileSystem);
    let tracked = Arc::new(TrackedObjects::new(&repo_root));
    let hasher = Arc::new(TrackedObjectHasher::new(
        tracked,
        ContentHasher::new(fs.clone()),
    ));
    let resolver = InputResolver::new(fs, hasher, Arc::new(GoListCommand));
    debug!(root = ?repo_root, "created task status evaluator");
    TaskStatusEvaluator::new(repo_root, store, resolver)
}

/// Like [`evaluator_for_repository`], with the repository root discovered
/// from `dir` via `git rev-parse --show-toplevel`.
pub fn evaluator_for_directory(
    dir: &Path,
    store: Arc<dyn RunStore>,
) -> Result<TaskStatusEvaluator> {
    let root = vcs::Git::toplevel(dir)?;
    Ok(evaluator_for_repository(root, store))
}
