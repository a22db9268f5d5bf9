// src/digest/hash.rs

//! File hashing: the content hasher (slow path) and the tracked-object
//! hasher that trusts git's index for unmodified files (fast path).

use std::fmt::Debug;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use blake3::Hasher;
use tracing::debug;

use crate::digest::{Algorithm, Digest};
use crate::errors::{Result, TaskgateError};
use crate::fs::FileSystem;
use crate::vcs::{ObjectMode, TrackedObjects};

/// Compute the content hash of a single file.
///
/// Any I/O failure is returned; a missing file is an error, not an empty
/// digest.
pub fn hash_file(fs: &dyn FileSystem, path: &Path) -> Result<Digest> {
    let mut hasher = Hasher::new();
    let mut reader = fs.open_read(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| TaskgateError::file_io(path)(e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Digest::new(
        Algorithm::ContentHash,
        hasher.finalize().as_bytes().to_vec(),
    ))
}

/// Strategy for turning an absolute file path into a [`Digest`].
pub trait FileHasher: Send + Sync + Debug {
    fn hash(&self, path: &Path) -> Result<Digest>;
}

/// Reads and hashes every file.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    fs: Arc<dyn FileSystem>,
}

impl ContentHasher {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl FileHasher for ContentHasher {
    fn hash(&self, path: &Path) -> Result<Digest> {
        debug!("hashing file content {:?}", path);
        hash_file(self.fs.as_ref(), path)
    }
}

/// Uses the git object id for tracked, unmodified regular files and falls
/// back to hashing the content for everything else.
///
/// Tracked symlinks also take the slow path: their object id covers the link
/// text only, not the content of the file it points to.
#[derive(Debug, Clone)]
pub struct TrackedObjectHasher {
    tracked: Arc<TrackedObjects>,
    fallback: ContentHasher,
}

impl TrackedObjectHasher {
    pub fn new(tracked: Arc<TrackedObjects>, fallback: ContentHasher) -> Self {
        Self { tracked, fallback }
    }
}

impl FileHasher for TrackedObjectHasher {
    fn hash(&self, path: &Path) -> Result<Digest> {
        match self.tracked.get(path)? {
            Some(obj) if obj.mode == ObjectMode::File => {
                debug!(object_id = %obj.object_id, "using git object id for {:?}", path);
                Digest::from_vcs_object_id(&obj.object_id)
            }
            _ => self.fallback.hash(path),
        }
    }
}
