// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskgateError {
    /// Malformed pattern, empty query, invalid task declaration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A non-optional declaration resolved to zero files.
    #[error("{kind} '{pattern}' matched no files")]
    NoMatch { kind: &'static str, pattern: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// I/O failure on a known file.
    #[error("IO error on {path:?}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Computing the digest of an input file failed.
    #[error("hashing input {path:?} failed: {source}")]
    Hashing {
        path: PathBuf,
        #[source]
        source: Box<TaskgateError>,
    },

    /// A subprocess (`git`, `go`) could not be spawned or exited unsuccessfully.
    #[error("command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// The path shares no root with the repository root (e.g. a relative
    /// path, or another drive).
    #[error("path {path:?} cannot be made relative to the repository root {root:?}")]
    NoCommonRoot { path: PathBuf, root: PathBuf },

    #[error("Run store error for task {task}: {source}")]
    Store {
        task: String,
        #[source]
        source: crate::status::StoreError,
    },

    /// Error raised by one of the input resolvers, with the resolver's name.
    #[error("resolving {resolver} inputs failed: {source}")]
    Resolver {
        resolver: &'static str,
        #[source]
        source: Box<TaskgateError>,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskgateError {
    pub fn config(msg: impl Into<String>) -> Self {
        TaskgateError::ConfigError(msg.into())
    }

    /// Map an `io::Error` on `path` to [`TaskgateError::FileIo`].
    pub fn file_io(path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| TaskgateError::FileIo { path, source }
    }

    /// Wrap `self` with the name of the resolver that produced it.
    pub fn in_resolver(self, resolver: &'static str) -> Self {
        TaskgateError::Resolver {
            resolver,
            source: Box::new(self),
        }
    }

    /// The innermost error below any `Resolver`/`Hashing` context wrappers.
    pub fn root_cause(&self) -> &TaskgateError {
        match self {
            TaskgateError::Resolver { source, .. } | TaskgateError::Hashing { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self.root_cause(), TaskgateError::NoMatch { .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self.root_cause(), TaskgateError::ConfigError(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskgateError>;
