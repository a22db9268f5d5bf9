// src/task.rs

//! Task model consumed by the resolvers and the status evaluator.

use std::path::{Path, PathBuf};

/// Plain glob patterns, relative to the task directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobSpec {
    pub paths: Vec<String>,
    pub optional: bool,
}

/// Glob patterns restricted to files tracked by git.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitGlobSpec {
    pub paths: Vec<String>,
    pub optional: bool,
}

/// Go source-dependency queries, resolved in the task directory.
///
/// Each query is one of:
/// - `file=<path>`: the package containing that file,
/// - `fileglob=<pattern>`: the packages containing the matched files,
/// - anything else: a package pattern passed to `go list` as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoSourceSpec {
    pub queries: Vec<String>,
    /// `KEY=VALUE` entries for the `go` process environment.
    pub environment: Vec<String>,
    /// Include `_test.go` files of the queried packages.
    pub tests: bool,
    pub optional: bool,
}

/// One declared input of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDeclaration {
    Glob(GlobSpec),
    GitGlob(GitGlobSpec),
    GoSource(GoSourceSpec),
}

/// A buildable unit of an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub app_name: String,
    pub name: String,
    /// Directory the input patterns are relative to.
    pub directory: PathBuf,
    /// Config file the task was declared in; always an implicit input.
    pub config_file: PathBuf,
    pub inputs: Vec<InputDeclaration>,
    /// Glob patterns (relative to `directory`) removed from the resolved set.
    pub excluded_files: Vec<String>,
}

impl Task {
    pub fn new(
        app_name: impl Into<String>,
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        config_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            name: name.into(),
            directory: directory.into(),
            config_file: config_file.into(),
            inputs: Vec::new(),
            excluded_files: Vec::new(),
        }
    }

    /// `<app>.<task>`
    pub fn id(&self) -> String {
        format!("{}.{}", self.app_name, self.name)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// True if the task declares at least one input. The implicit config
    /// file input does not count.
    pub fn has_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }
}
