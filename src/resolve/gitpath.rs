// src/resolve/gitpath.rs

//! Glob resolution restricted to files tracked by git.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, TaskgateError};
use crate::path_utils::normalize;
use crate::resolve::glob::GlobResolver;
use crate::task::GitGlobSpec;
use crate::vcs::Git;

/// Computes the same match set as [`GlobResolver`] and keeps only files that
/// are in the git index, so untracked clutter in a checkout never changes
/// the result.
#[derive(Debug, Clone)]
pub struct GitPathResolver {
    glob: GlobResolver,
}

impl GitPathResolver {
    pub fn new(glob: GlobResolver) -> Self {
        Self { glob }
    }

    /// `repo_root` is the root of the repository, `base_dir` the directory
    /// patterns are relative to.
    pub fn resolve(
        &self,
        repo_root: &Path,
        base_dir: &Path,
        specs: &[GitGlobSpec],
    ) -> Result<Vec<PathBuf>> {
        if specs.iter().all(|s| s.paths.is_empty()) {
            return Ok(Vec::new());
        }

        let tracked = Git::new(normalize(repo_root)).tracked_files()?;

        let mut out = Vec::new();
        for spec in specs {
            for pattern in &spec.paths {
                let matches: Vec<PathBuf> = self
                    .glob
                    .resolve_pattern(base_dir, pattern)?
                    .into_iter()
                    .filter(|p| tracked.contains(p))
                    .collect();
                debug!(pattern, matches = matches.len(), "resolved git glob pattern");

                if matches.is_empty() && !spec.optional {
                    return Err(TaskgateError::NoMatch {
                        kind: "git glob",
                        pattern: pattern.clone(),
                    });
                }
                out.extend(matches);
            }
        }
        Ok(out)
    }
}
