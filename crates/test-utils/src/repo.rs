//! Throwaway git repositories for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tempfile::TempDir;

/// A git repository in a temporary directory, removed on drop.
pub struct TestRepo {
    _dir: TempDir,
    root: PathBuf,
}

impl TestRepo {
    /// Create and `git init` a new repository.
    ///
    /// Returns `None` when no `git` executable is available, so callers can
    /// skip the test.
    pub fn init() -> Option<Result<Self>> {
        if !taskgate::vcs::Git::is_available() {
            eprintln!("git not available; skipping");
            return None;
        }
        Some(Self::init_inner())
    }

    fn init_inner() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        // Resolve symlinked temp dirs (macOS /var -> /private/var) so paths
        // compare equal to what git reports.
        let root = dir.path().canonicalize()?;
        let repo = Self { _dir: dir, root };
        repo.git(&["init", "-q"])?;
        repo.git(&["config", "user.email", "test@example.com"])?;
        repo.git(&["config", "user.name", "Test"])?;
        repo.git(&["config", "commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn add(&self, paths: &[&str]) -> Result<()> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.git(&args)
    }

    pub fn add_all(&self) -> Result<()> {
        self.git(&["add", "-A"])
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.git(&["commit", "-q", "-m", message])
    }

    /// Run git in the repository root and fail on a non-zero exit.
    pub fn git(&self, args: &[&str]) -> Result<()> {
        self.git_output(args).map(|_| ())
    }

    pub fn git_output(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .with_context(|| format!("spawning git {args:?}"))?;
        if !output.status.success() {
            bail!(
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
