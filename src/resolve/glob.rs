// src/resolve/glob.rs

//! Recursive glob resolution against a [`FileSystem`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::{Result, TaskgateError};
use crate::fs::FileSystem;
use crate::path_utils::{normalize, to_slash};
use crate::task::GlobSpec;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Resolves glob patterns to the regular files they match.
///
/// Supported syntax: `*`, `?`, `[...]` and `{a,b}` within one path segment,
/// and `**` for zero or more segments. A pattern may contain `**` at most
/// once.
#[derive(Debug, Clone)]
pub struct GlobResolver {
    fs: Arc<dyn FileSystem>,
}

/// A pattern split into the directory the walk starts from and the
/// compiled matcher for the remaining wildcard segments.
struct CompiledPattern {
    walk_root: PathBuf,
    matcher: Option<GlobMatcher>,
    /// Number of segments below `walk_root` a match has; `None` if the
    /// pattern contains `**`.
    max_depth: Option<usize>,
}

impl GlobResolver {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Resolve all glob declarations relative to `base_dir`.
    pub fn resolve(&self, base_dir: &Path, specs: &[GlobSpec]) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for spec in specs {
            for pattern in &spec.paths {
                let matches = self.resolve_pattern(base_dir, pattern)?;
                if matches.is_empty() && !spec.optional {
                    return Err(TaskgateError::NoMatch {
                        kind: "glob",
                        pattern: pattern.clone(),
                    });
                }
                out.extend(matches);
            }
        }
        Ok(out)
    }

    /// Resolve one pattern. Matching nothing is not an error here.
    pub fn resolve_pattern(&self, base_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let compiled = compile(base_dir, pattern)?;

        let Some(matcher) = compiled.matcher else {
            // No wildcard at all: a literal path.
            let path = compiled.walk_root;
            return Ok(if self.fs.is_file(&path) {
                vec![path]
            } else {
                Vec::new()
            });
        };

        let mut files = Vec::new();
        if !self.fs.is_dir(&compiled.walk_root) {
            debug!(pattern, root = ?compiled.walk_root, "glob root is not a directory");
            return Ok(files);
        }

        let mut stack = vec![(compiled.walk_root.clone(), 0usize)];
        while let Some((dir, depth)) = stack.pop() {
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    let descend = compiled.max_depth.is_none_or(|max| depth + 1 < max);
                    if descend && !self.fs.is_symlink(&path) {
                        stack.push((path, depth + 1));
                    }
                } else if self.fs.is_file(&path) && matcher.is_match(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        debug!(pattern, matches = files.len(), "resolved glob pattern");
        Ok(files)
    }
}

fn compile(base_dir: &Path, pattern: &str) -> Result<CompiledPattern> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(TaskgateError::config("empty glob pattern"));
    }
    if pattern.matches("**").count() > 1 {
        return Err(TaskgateError::config(format!(
            "glob pattern '{pattern}' contains '**' more than once"
        )));
    }

    let (start, rest) = match pattern.strip_prefix('/') {
        Some(rest) => (PathBuf::from("/"), rest),
        None => (base_dir.to_path_buf(), pattern),
    };

    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    let first_wild = segments.iter().position(|s| s.contains(GLOB_META));

    let (literal, wild) = match first_wild {
        Some(idx) => segments.split_at(idx),
        None => (segments.as_slice(), &[][..]),
    };

    if wild.iter().any(|s| *s == "..") {
        return Err(TaskgateError::config(format!(
            "glob pattern '{pattern}' has '..' after a wildcard"
        )));
    }

    let mut walk_root = start;
    for seg in literal {
        walk_root.push(seg);
    }
    let walk_root = normalize(&walk_root);

    if wild.is_empty() {
        return Ok(CompiledPattern {
            walk_root,
            matcher: None,
            max_depth: None,
        });
    }

    let root_str = to_slash(&walk_root);
    let full = format!(
        "{}/{}",
        globset::escape(root_str.trim_end_matches('/')),
        wild.join("/")
    );
    let matcher = GlobBuilder::new(&full)
        .literal_separator(true)
        .build()
        .map_err(|e| TaskgateError::config(format!("invalid glob pattern '{pattern}': {e}")))?
        .compile_matcher();

    let max_depth = if wild.iter().any(|s| s.contains("**")) {
        None
    } else {
        Some(wild.len())
    };

    Ok(CompiledPattern {
        walk_root,
        matcher: Some(matcher),
        max_depth,
    })
}

/// Build a GlobSet from patterns relative to `base_dir`, matching absolute
/// paths.
pub fn build_globset(base_dir: &Path, patterns: &[String]) -> Result<GlobSet> {
    let base = to_slash(&normalize(base_dir));
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        if pat.matches("**").count() > 1 {
            return Err(TaskgateError::config(format!(
                "glob pattern '{pat}' contains '**' more than once"
            )));
        }
        let full = match pat.strip_prefix('/') {
            Some(_) => pat.clone(),
            None => format!(
                "{}/{}",
                globset::escape(base.trim_end_matches('/')),
                pat.trim_start_matches("./")
            ),
        };
        let glob = GlobBuilder::new(&full)
            .literal_separator(true)
            .build()
            .map_err(|e| TaskgateError::config(format!("invalid glob pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| TaskgateError::config(format!("building glob set: {e}")))
}
