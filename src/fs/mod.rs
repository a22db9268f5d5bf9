// src/fs/mod.rs

//! Filesystem access used by the glob resolver and the content hasher.
//!
//! Everything that walks directories or reads file contents goes through the
//! [`FileSystem`] trait so resolution and hashing can run against
//! [`mock::MockFileSystem`] in tests.

use std::fmt::Debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::errors::{Result, TaskgateError};

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    /// Errors name `path`.
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    /// True for regular files (symlinks are followed).
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn is_symlink(&self, path: &Path) -> bool;

    /// Return the entries of a directory as full paths, sorted.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).map_err(TaskgateError::file_io(path))?;
        Ok(Box::new(file))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.is_symlink()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(TaskgateError::file_io(path))? {
            entries.push(entry.map_err(|e| TaskgateError::file_io(path)(e))?.path());
        }
        entries.sort();
        Ok(entries)
    }
}
