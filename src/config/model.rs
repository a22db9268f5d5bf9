// src/config/model.rs

use serde::Deserialize;

/// Application config as read from a TOML file.
///
/// ```toml
/// name = "shop"
///
/// [[task]]
/// name = "build"
///
/// [[task.input.files]]
/// paths = ["*.txt"]
///
/// [[task.input.git_files]]
/// paths = ["src/**/*.rs"]
/// optional = true
///
/// [[task.input.golang_sources]]
/// queries = ["./..."]
/// environment = ["GOFLAGS=-mod=vendor"]
/// tests = false
///
/// [task.input.excluded_files]
/// paths = ["*_gen.go"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawAppConfig {
    pub name: String,

    #[serde(default)]
    pub task: Vec<TaskSection>,
}

/// A validated [`RawAppConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    name: String,
    tasks: Vec<TaskSection>,
}

impl AppConfig {
    /// Used by the `TryFrom<RawAppConfig>` impl after validation.
    pub(crate) fn new_unchecked(name: String, tasks: Vec<TaskSection>) -> Self {
        Self { name, tasks }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[TaskSection] {
        &self.tasks
    }
}

/// `[[task]]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSection {
    pub name: String,

    /// A task without an `[task.input]` section always has to run.
    #[serde(default)]
    pub input: Option<InputSection>,
}

/// `[task.input]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSection {
    #[serde(default)]
    pub files: Vec<FilesSection>,

    #[serde(default)]
    pub git_files: Vec<GitFilesSection>,

    #[serde(default)]
    pub golang_sources: Vec<GoSourcesSection>,

    #[serde(default)]
    pub excluded_files: ExcludedFilesSection,
}

impl InputSection {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.git_files.is_empty() && self.golang_sources.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesSection {
    pub paths: Vec<String>,

    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitFilesSection {
    pub paths: Vec<String>,

    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoSourcesSection {
    pub queries: Vec<String>,

    /// `KEY=VALUE` entries for the `go` tool.
    #[serde(default)]
    pub environment: Vec<String>,

    #[serde(default)]
    pub tests: bool,

    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludedFilesSection {
    #[serde(default)]
    pub paths: Vec<String>,
}
