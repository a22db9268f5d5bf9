// src/inputs/mod.rs

//! Resolved task inputs and their digests.

pub mod resolver;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::digest::{fold, Digest, FileHasher};
use crate::errors::{Result, TaskgateError};
use crate::path_utils::{normalize, relative_path, to_slash};

pub use resolver::InputResolver;

/// A file input, identified by its path relative to the repository root.
///
/// The digest covers both the relative path and the content, so the same
/// content at two locations gives two different digests. It is computed at
/// most once per instance.
pub struct File {
    repo_root: PathBuf,
    rel_path: PathBuf,
    hasher: Arc<dyn FileHasher>,
    digest: OnceLock<Digest>,
}

impl File {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        rel_path: impl Into<PathBuf>,
        hasher: Arc<dyn FileHasher>,
    ) -> Self {
        Self {
            repo_root: repo_root.into(),
            rel_path: rel_path.into(),
            hasher,
            digest: OnceLock::new(),
        }
    }

    /// Build a `File` from an absolute path.
    ///
    /// Files outside `repo_root` (e.g. Go modules in the module cache) get a
    /// relative path starting with `..`.
    pub fn from_absolute(
        repo_root: &Path,
        abs_path: &Path,
        hasher: Arc<dyn FileHasher>,
    ) -> Result<Self> {
        let root = normalize(repo_root);
        let rel = relative_path(&root, abs_path).ok_or_else(|| TaskgateError::NoCommonRoot {
            path: abs_path.to_path_buf(),
            root: root.clone(),
        })?;
        Ok(Self::new(root, rel, hasher))
    }

    pub fn repository_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn relative_path(&self) -> &Path {
        &self.rel_path
    }

    pub fn absolute_path(&self) -> PathBuf {
        normalize(&self.repo_root.join(&self.rel_path))
    }

    /// Whether the digest has already been computed.
    pub fn is_digest_resolved(&self) -> bool {
        self.digest.get().is_some()
    }

    pub fn digest(&self) -> Result<Digest> {
        if let Some(d) = self.digest.get() {
            return Ok(d.clone());
        }
        let content = self
            .hasher
            .hash(&self.absolute_path())
            .map_err(|e| TaskgateError::Hashing {
                path: self.rel_path.clone(),
                source: Box::new(e),
            })?;
        let path = Digest::of_bytes(to_slash(&self.rel_path));
        let digest = fold([&path, &content]);
        debug!(path = ?self.rel_path, %content, %digest, "computed file digest");
        Ok(self.digest.get_or_init(|| digest).clone())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("repo_root", &self.repo_root)
            .field("rel_path", &self.rel_path)
            .field("digest", &self.digest.get())
            .finish_non_exhaustive()
    }
}

/// A free-form string folded into the task fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringInput {
    value: String,
}

impl StringInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn digest(&self) -> Digest {
        Digest::of_bytes(format!("string:{}", self.value))
    }
}

#[derive(Debug)]
pub enum Input {
    File(File),
    String(StringInput),
}

impl Input {
    pub fn digest(&self) -> Result<Digest> {
        match self {
            Input::File(f) => f.digest(),
            Input::String(s) => Ok(s.digest()),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::File(file) => write!(f, "{}", to_slash(file.relative_path())),
            Input::String(s) => write!(f, "string:{}", s.value()),
        }
    }
}

/// Ordered inputs of one task resolution.
#[derive(Debug, Default)]
pub struct Inputs {
    inputs: Vec<Input>,
    digest: OnceLock<Digest>,
}

impl Inputs {
    pub fn new(files: Vec<File>) -> Self {
        Self {
            inputs: files.into_iter().map(Input::File).collect(),
            digest: OnceLock::new(),
        }
    }

    /// Append the string input. An `Inputs` holds at most one.
    pub fn with_string(mut self, value: impl Into<String>) -> Result<Self> {
        if self.inputs.iter().any(|i| matches!(i, Input::String(_))) {
            return Err(TaskgateError::config("inputs already contain a string input"));
        }
        self.inputs.push(Input::String(StringInput::new(value)));
        self.digest = OnceLock::new();
        Ok(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Input> {
        self.inputs.iter()
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.inputs.iter().filter_map(|i| match i {
            Input::File(f) => Some(f),
            Input::String(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn is_digest_resolved(&self) -> bool {
        self.digest.get().is_some()
    }

    /// Total input digest: [`fold`] over every input digest, in order.
    pub fn digest(&self) -> Result<Digest> {
        if let Some(d) = self.digest.get() {
            return Ok(d.clone());
        }
        let digests = self
            .inputs
            .iter()
            .map(Input::digest)
            .collect::<Result<Vec<_>>>()?;
        let total = fold(&digests);
        debug!(inputs = digests.len(), digest = %total, "computed total input digest");
        Ok(self.digest.get_or_init(|| total).clone())
    }
}
