// src/status/store.rs

//! Run-history lookup interface.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// A recorded task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub app_name: String,
    pub task_name: String,
    /// Canonical string form of the total input digest.
    pub total_input_digest: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// No run matches the key. This is a normal outcome.
    #[error("no matching run found")]
    NotFound,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Read access to recorded runs, keyed by application, task and total input
/// digest.
pub trait RunStore: Send + Sync {
    fn latest_run(
        &self,
        app_name: &str,
        task_name: &str,
        total_input_digest: &str,
    ) -> Result<Run, StoreError>;
}

type RunKey = (String, String, String);

/// Keeps runs in memory only.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    runs: HashMap<RunKey, Run>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a run; a later run with the same key replaces the earlier one.
    pub fn save_run(&self, app_name: &str, task_name: &str, total_input_digest: &str) -> Run {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.next_id += 1;
        let run = Run {
            id: state.next_id,
            app_name: app_name.to_string(),
            task_name: task_name.to_string(),
            total_input_digest: total_input_digest.to_string(),
        };
        state.runs.insert(
            (
                app_name.to_string(),
                task_name.to_string(),
                total_input_digest.to_string(),
            ),
            run.clone(),
        );
        info!(app = %app_name, task = %task_name, digest = %total_input_digest, id = run.id, "stored run (memory)");
        run
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.runs.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().runs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RunStore for MemoryRunStore {
    fn latest_run(
        &self,
        app_name: &str,
        task_name: &str,
        total_input_digest: &str,
    ) -> Result<Run, StoreError> {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state
            .runs
            .get(&(
                app_name.to_string(),
                task_name.to_string(),
                total_input_digest.to_string(),
            ))
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}
