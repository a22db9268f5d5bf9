// src/digest/mod.rs

//! Typed content fingerprints.
//!
//! A [`Digest`] is always tagged with the [`Algorithm`] that produced it.
//! Two digests are equal only if both the algorithm and the raw bytes match,
//! so a git object id can never be mistaken for a content hash that happens
//! to share its bytes.
//!
//! [`fold`] combines an ordered list of digests (of any algorithm) into one
//! content hash. It is used both for the per-file digest (path + content) and
//! for a task's total input digest.

pub mod hash;

use std::fmt;
use std::str::FromStr;

use blake3::Hasher;

use crate::errors::TaskgateError;

pub use hash::{hash_file, ContentHasher, FileHasher, TrackedObjectHasher};

/// Hash algorithm a [`Digest`] was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Algorithm {
    /// blake3 over the raw bytes.
    ContentHash,
    /// Object id assigned by git (sha1 of the blob header + content).
    VcsObjectId,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::ContentHash => "blake3",
            Algorithm::VcsObjectId => "git-oid",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = TaskgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blake3" => Ok(Algorithm::ContentHash),
            "git-oid" => Ok(Algorithm::VcsObjectId),
            other => Err(TaskgateError::config(format!(
                "unknown digest algorithm: {other} (expected \"blake3\" or \"git-oid\")"
            ))),
        }
    }
}

/// An algorithm-tagged fingerprint. String form: `<algorithm>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    algorithm: Algorithm,
    value: Vec<u8>,
}

impl Digest {
    pub fn new(algorithm: Algorithm, value: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            value: value.into(),
        }
    }

    /// Content hash of an in-memory value.
    pub fn of_bytes(data: impl AsRef<[u8]>) -> Self {
        let hash = blake3::hash(data.as_ref());
        Self::new(Algorithm::ContentHash, hash.as_bytes().to_vec())
    }

    /// Wrap a hex-encoded git object id. Performs no file I/O.
    pub fn from_vcs_object_id(id: &str) -> Result<Self, TaskgateError> {
        let value = hex::decode(id).map_err(|e| {
            TaskgateError::config(format!("invalid git object id {id:?}: {e}"))
        })?;
        Ok(Self::new(Algorithm::VcsObjectId, value))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.value)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = TaskgateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (alg, value) = s.split_once(':').ok_or_else(|| {
            TaskgateError::config(format!("digest {s:?} is not in <algorithm>:<hex> form"))
        })?;
        let algorithm = alg.parse::<Algorithm>()?;
        let value = hex::decode(value)
            .map_err(|e| TaskgateError::config(format!("digest {s:?} has invalid hex: {e}")))?;
        Ok(Self::new(algorithm, value))
    }
}

/// Combine digests into one content hash.
///
/// The canonical string of every digest is fed to the hasher in the given
/// order, each terminated by a newline. Reordering the input changes the
/// result.
pub fn fold<'a, I>(digests: I) -> Digest
where
    I: IntoIterator<Item = &'a Digest>,
{
    let mut hasher = Hasher::new();
    for d in digests {
        hasher.update(d.to_string().as_bytes());
        hasher.update(b"\n");
    }
    Digest::new(
        Algorithm::ContentHash,
        hasher.finalize().as_bytes().to_vec(),
    )
}
