//! The contract every background monitor presents to the orchestrator.
//!
//! A task is a named, zero-argument operation that settles asynchronously
//! with success or a [`TaskFailure`]. The orchestrator never looks inside a
//! task: download tracking, process detection, achievement matching and
//! update polling all live behind this trait, owned by their collaborators.

mod adapters;
mod command;
mod set;

use std::fmt;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;

use crate::Error;

pub use adapters::{BlockingTask, FnTask};
pub(crate) use adapters::panic_message;
pub use command::CommandTask;
pub use set::{TaskSet, TaskSetBuilder};

/// What a task produces when it settles.
pub type TaskResult = std::result::Result<(), TaskFailure>;

/// A recurring unit of background work.
///
/// `run` is called exactly once per cycle. Implementations decide their own
/// retry policy, internal concurrency and duration; they must not assume
/// any particular invocation rate.
pub trait Task: Send + Sync {
    /// Stable name, unique within a [`TaskSet`].
    fn name(&self) -> &str;

    /// Start one invocation of the task.
    fn run(&self) -> BoxFuture<'_, TaskResult>;
}

/// Why a task did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The task itself reported an error.
    Rejected,
    /// The task did not settle within the configured per-task timeout.
    TimedOut,
    /// The task panicked while running.
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Rejected => "rejected",
            FailureKind::TimedOut => "timed out",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// A task's failure, captured as data rather than raised.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}: {reason}")]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub reason: String,
}

impl TaskFailure {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Rejected,
            reason: reason.into(),
        }
    }

    pub fn timed_out(after: std::time::Duration) -> Self {
        Self {
            kind: FailureKind::TimedOut,
            reason: format!("did not settle within {:?}", after),
        }
    }

    pub fn panicked(reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panicked,
            reason: reason.into(),
        }
    }
}

impl From<Error> for TaskFailure {
    fn from(err: Error) -> Self {
        Self::rejected(err.to_string())
    }
}

impl From<std::io::Error> for TaskFailure {
    fn from(err: std::io::Error) -> Self {
        Self::rejected(err.to_string())
    }
}

/// Settled state of one task in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Success,
    Failure(TaskFailure),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TaskOutcome::Success => None,
            TaskOutcome::Failure(f) => Some(f),
        }
    }
}

impl From<TaskResult> for TaskOutcome {
    fn from(result: TaskResult) -> Self {
        match result {
            Ok(()) => TaskOutcome::Success,
            Err(failure) => TaskOutcome::Failure(failure),
        }
    }
}
