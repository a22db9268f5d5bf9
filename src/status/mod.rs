// src/status/mod.rs

//! Task status evaluation: resolve inputs, compute the total input digest
//! and look it up in the run store.

pub mod store;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::errors::{Result, TaskgateError};
use crate::inputs::{InputResolver, Inputs};
use crate::task::Task;

pub use store::{MemoryRunStore, Run, RunStore, StoreError};

/// Outcome of a status evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task declares no inputs; it always has to run.
    InputsUndefined,
    /// Resolution or digest computation failed; no decision can be made.
    Undefined,
    /// A run with the same total input digest exists.
    RunExists,
    /// No run with the current total input digest exists.
    ExecutionPending,
}

impl TaskStatus {
    /// Status of an evaluation result; errors map to `Undefined`.
    pub fn of(result: &Result<Evaluation>) -> TaskStatus {
        match result {
            Ok(eval) => eval.status,
            Err(_) => TaskStatus::Undefined,
        }
    }

    pub fn must_run(&self) -> bool {
        matches!(self, TaskStatus::InputsUndefined | TaskStatus::ExecutionPending)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::InputsUndefined => "inputs undefined",
            TaskStatus::Undefined => "undefined",
            TaskStatus::RunExists => "run exists",
            TaskStatus::ExecutionPending => "pending",
        };
        f.write_str(s)
    }
}

/// Result of [`TaskStatusEvaluator::status`].
#[derive(Debug)]
pub struct Evaluation {
    pub status: TaskStatus,
    /// Resolved inputs; `None` for `InputsUndefined`.
    pub inputs: Option<Inputs>,
    /// The matching run for `RunExists`.
    pub run: Option<Run>,
}

/// Decides whether a task has to run.
pub struct TaskStatusEvaluator {
    repo_root: PathBuf,
    store: Arc<dyn RunStore>,
    resolver: InputResolver,
    input_string: Option<String>,
}

impl fmt::Debug for TaskStatusEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStatusEvaluator")
            .field("repo_root", &self.repo_root)
            .field("input_string", &self.input_string)
            .finish_non_exhaustive()
    }
}

impl TaskStatusEvaluator {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        store: Arc<dyn RunStore>,
        resolver: InputResolver,
    ) -> Self {
        Self {
            repo_root: repo_root.into(),
            store,
            resolver,
            input_string: None,
        }
    }

    /// Fold `value` into the inputs of every evaluated task.
    pub fn with_input_string(mut self, value: impl Into<String>) -> Self {
        self.input_string = Some(value.into());
        self
    }

    pub fn repository_root(&self) -> &Path {
        &self.repo_root
    }

    /// Evaluate the status of `task`.
    ///
    /// An `Err` means the status is [`TaskStatus::Undefined`]. Nothing is
    /// retried.
    #[instrument(skip_all, fields(task = %task.id()))]
    pub fn status(&self, task: &Task) -> Result<Evaluation> {
        if !task.has_inputs() {
            debug!("task has no inputs declared");
            return Ok(Evaluation {
                status: TaskStatus::InputsUndefined,
                inputs: None,
                run: None,
            });
        }

        let mut inputs = self.resolver.resolve(&self.repo_root, task)?;
        if let Some(value) = &self.input_string {
            inputs = inputs.with_string(value.clone())?;
        }

        let digest = inputs.digest()?.to_string();

        match self.store.latest_run(&task.app_name, &task.name, &digest) {
            Ok(run) => {
                info!(%digest, run_id = run.id, "found run with matching inputs");
                Ok(Evaluation {
                    status: TaskStatus::RunExists,
                    inputs: Some(inputs),
                    run: Some(run),
                })
            }
            Err(StoreError::NotFound) => {
                info!(%digest, "no run with matching inputs");
                Ok(Evaluation {
                    status: TaskStatus::ExecutionPending,
                    inputs: Some(inputs),
                    run: None,
                })
            }
            Err(source) => Err(TaskgateError::Store {
                task: task.id(),
                source,
            }),
        }
    }
}
