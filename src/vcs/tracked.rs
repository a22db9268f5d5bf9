// src/vcs/tracked.rs

//! Lazily-built index of tracked, unmodified files and their git object ids.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use anyhow::anyhow;
use tracing::{debug, info};

use crate::errors::{Result, TaskgateError};
use crate::vcs::listing::{parse_record, EntryStatus, ListingRecord};
use crate::vcs::Git;

/// Number of parsed records buffered between the reader thread and the
/// indexer.
const SCAN_CHANNEL_CAPACITY: usize = 4096;

const LS_FILES_ARGS: &[&str] = &[
    "-c",
    "core.quotepath=off",
    "ls-files",
    "-s",
    "-t",
    "-c",
    "-m",
    "-d",
    "-o",
    "--exclude-standard",
    "-u",
    "-z",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectMode {
    File,
    Symlink,
}

/// Index record of a file whose working tree content matches the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedObject {
    pub object_id: String,
    pub mode: ObjectMode,
}

type Index = HashMap<PathBuf, TrackedObject>;

/// Path → object id cache for one repository.
///
/// The repository is scanned at most once, on the first [`get`] call.
/// Construct a new instance whenever the working tree may have changed.
///
/// [`get`]: TrackedObjects::get
#[derive(Debug)]
pub struct TrackedObjects {
    root: PathBuf,
    index: OnceLock<std::result::Result<Index, String>>,
    scans: AtomicUsize,
}

impl TrackedObjects {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: OnceLock::new(),
            scans: AtomicUsize::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the one-time scan has already run.
    pub fn is_scanned(&self) -> bool {
        self.index.get().is_some()
    }

    /// Number of listing scans started by this instance (0 or 1).
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// Look up the object for an absolute path (relative paths are taken
    /// relative to the repository root).
    ///
    /// Returns `Ok(None)` for untracked, modified or removed files. A failed
    /// scan is reported to every caller.
    pub fn get(&self, path: &Path) -> Result<Option<TrackedObject>> {
        let index = self
            .index
            .get_or_init(|| {
                self.scans.fetch_add(1, Ordering::Relaxed);
                scan(&self.root).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|msg| {
                TaskgateError::Other(anyhow!(
                    "scanning tracked git objects in {:?} failed: {msg}",
                    self.root
                ))
            })?;

        let found = if path.is_absolute() {
            index.get(path)
        } else {
            index.get(&self.root.join(path))
        };
        Ok(found.cloned())
    }
}

/// Run the listing command, streaming parsed records from a reader thread
/// into [`index_records`].
fn scan(root: &Path) -> Result<Index> {
    let command = format!("git {}", LS_FILES_ARGS.join(" "));
    let mut child = Git::new(root)
        .command(LS_FILES_ARGS)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TaskgateError::Command {
            command: command.clone(),
            message: e.to_string(),
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout of `{command}` was not piped"))?;

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr of `{command}` was not piped"))?;
    // git blocks once a full stderr pipe is left unread.
    let stderr_reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let (tx, rx) = sync_channel::<Result<ListingRecord>>(SCAN_CHANNEL_CAPACITY);
    let producer = thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for chunk in reader.split(0) {
            let record = chunk
                .map_err(TaskgateError::from)
                .and_then(|raw| parse_record(&raw));
            let failed = record.is_err();
            if tx.send(record).is_err() || failed {
                break;
            }
        }
    });

    let indexed = index_records(root, rx);

    producer
        .join()
        .map_err(|_| anyhow!("reader thread of `{command}` panicked"))?;
    let status = child.wait()?;
    let stderr = stderr_reader
        .join()
        .map_err(|_| anyhow!("stderr reader of `{command}` panicked"))?;
    let index = indexed?;
    if !status.success() {
        return Err(TaskgateError::Command {
            command,
            message: format!(
                "exit status {}: {}",
                status,
                String::from_utf8_lossy(&stderr).trim()
            ),
        });
    }

    info!(root = ?root, entries = index.len(), "indexed tracked git objects");
    Ok(index)
}

/// Build the index from a stream of records.
///
/// A path is indexed only if every record seen for it is a cached entry of a
/// regular file or symlink. Any other status excludes it for good, even if a
/// cached record for the same path arrives later.
fn index_records(root: &Path, records: Receiver<Result<ListingRecord>>) -> Result<Index> {
    let mut index = Index::new();
    let mut excluded: HashSet<PathBuf> = HashSet::new();

    for record in records {
        let record = record?;
        let abs = root.join(&record.path);

        if record.status != EntryStatus::Cached {
            debug!(status = ?record.status, "excluding {:?} from tracked objects", abs);
            index.remove(&abs);
            excluded.insert(abs);
            continue;
        }
        if excluded.contains(&abs) {
            continue;
        }

        match (record.object_mode(), record.object_id) {
            (Some(mode), Some(object_id)) => {
                index.insert(abs, TrackedObject { object_id, mode });
            }
            _ => debug!("ignoring non-file index entry {:?}", abs),
        }
    }

    debug!(excluded = excluded.len(), "finished indexing listing records");
    Ok(index)
}
