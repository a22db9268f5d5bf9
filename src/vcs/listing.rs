// src/vcs/listing.rs

//! Parser for `git ls-files -s -t -z` records.
//!
//! Index entries look like `H 100644 <oid> 0\t<path>`, untracked entries
//! like `? <path>`. Records are NUL-terminated so paths may contain any
//! byte, including tabs and newlines.

use std::path::PathBuf;

use crate::errors::{Result, TaskgateError};
use crate::vcs::ObjectMode;

/// Status tag printed by `git ls-files -t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Cached,
    SkipWorktree,
    Unmerged,
    Removed,
    Changed,
    ToBeKilled,
    Untracked,
    ResolveUndo,
}

impl EntryStatus {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            b'H' => EntryStatus::Cached,
            b'S' => EntryStatus::SkipWorktree,
            b'M' => EntryStatus::Unmerged,
            b'R' => EntryStatus::Removed,
            b'C' => EntryStatus::Changed,
            b'K' => EntryStatus::ToBeKilled,
            b'?' => EntryStatus::Untracked,
            b'U' => EntryStatus::ResolveUndo,
            _ => return None,
        })
    }
}

/// One parsed listing record. `mode` and `object_id` are only present for
/// index entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub status: EntryStatus,
    pub mode: Option<String>,
    pub object_id: Option<String>,
    /// Path relative to the directory git ran in.
    pub path: PathBuf,
}

impl ListingRecord {
    /// Object mode for regular files and symlinks; `None` for anything else
    /// (submodules, records without a mode).
    pub fn object_mode(&self) -> Option<ObjectMode> {
        match self.mode.as_deref() {
            Some("100644") | Some("100755") => Some(ObjectMode::File),
            Some("120000") => Some(ObjectMode::Symlink),
            _ => None,
        }
    }
}

/// Parse a single record (without its NUL terminator).
pub fn parse_record(raw: &[u8]) -> Result<ListingRecord> {
    let malformed =
        || TaskgateError::config(format!("malformed git ls-files record: {:?}", String::from_utf8_lossy(raw)));

    if raw.len() < 3 || raw[1] != b' ' {
        return Err(malformed());
    }
    let status = EntryStatus::from_tag(raw[0]).ok_or_else(malformed)?;
    let rest = &raw[2..];

    if status == EntryStatus::Untracked {
        return Ok(ListingRecord {
            status,
            mode: None,
            object_id: None,
            path: path_from_bytes(rest),
        });
    }

    let tab = rest.iter().position(|b| *b == b'\t');
    let Some(tab) = tab else {
        return Ok(ListingRecord {
            status,
            mode: None,
            object_id: None,
            path: path_from_bytes(rest),
        });
    };

    let meta = std::str::from_utf8(&rest[..tab]).map_err(|_| malformed())?;
    let mut fields = meta.split_ascii_whitespace();
    let mode = fields.next().ok_or_else(malformed)?;
    let object_id = fields.next().ok_or_else(malformed)?;
    // stage number is not needed

    Ok(ListingRecord {
        status,
        mode: Some(mode.to_string()),
        object_id: Some(object_id.to_string()),
        path: path_from_bytes(&rest[tab + 1..]),
    })
}

#[cfg(unix)]
pub(crate) fn path_from_bytes(raw: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(raw))
}

#[cfg(not(unix))]
pub(crate) fn path_from_bytes(raw: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(raw).into_owned())
}
