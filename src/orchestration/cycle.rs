//! One round of running every task and collecting every outcome.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Serialize, Serializer};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::task::{panic_message, Task, TaskFailure, TaskOutcome, TaskResult, TaskSet};
use crate::vlog_trace;

use super::RunId;

/// How one task settled within a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub outcome: TaskOutcome,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

/// The full outcome vector of one cycle, in task-set order.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub run_id: RunId,
    pub index: u64,
    pub started_at: DateTime<Utc>,
    pub settled_at: DateTime<Utc>,
    pub outcomes: Vec<TaskReport>,
    /// Monotonic instant the first task was launched.
    #[serde(skip)]
    pub launched: Instant,
    /// Monotonic instant the last task settled.
    #[serde(skip)]
    pub settled: Instant,
}

impl CycleReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &TaskFailure)> {
        self.outcomes
            .iter()
            .filter_map(|r| r.outcome.failure().map(|f| (r.name.as_str(), f)))
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Wall time from first launch to last settlement.
    pub fn duration(&self) -> Duration {
        self.settled.duration_since(self.launched)
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Launch every task in declared order, then wait for all of them.
///
/// Each task runs in its own tokio task, so a failure or panic in one slot
/// never reaches its siblings. With a timeout, an overrunning task is
/// recorded as timed out and left running detached; it is not aborted.
pub(crate) async fn run_cycle(
    run_id: RunId,
    index: u64,
    tasks: &TaskSet,
    timeout: Option<Duration>,
) -> CycleReport {
    let started_at = Utc::now();
    let launched = Instant::now();

    let slots: Vec<(String, JoinHandle<TaskResult>)> = tasks
        .iter()
        .map(|task| {
            let task: Arc<dyn Task> = Arc::clone(task);
            let name = task.name().to_string();
            vlog_trace!("cycle {} launch {}", index, name);
            (name, tokio::spawn(async move { task.run().await }))
        })
        .collect();

    let outcomes = join_all(slots.into_iter().map(|(name, handle)| async move {
        let outcome = settle(handle, timeout).await;
        let elapsed = launched.elapsed();
        vlog_trace!("cycle {} settled {} after {:?}", index, name, elapsed);
        TaskReport {
            name,
            outcome,
            elapsed,
        }
    }))
    .await;

    CycleReport {
        run_id,
        index,
        started_at,
        settled_at: Utc::now(),
        outcomes,
        launched,
        settled: Instant::now(),
    }
}

async fn settle(handle: JoinHandle<TaskResult>, timeout: Option<Duration>) -> TaskOutcome {
    let joined = match timeout {
        None => handle.await,
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            // Dropping the JoinHandle detaches the task; it keeps running.
            Err(_) => return TaskOutcome::Failure(TaskFailure::timed_out(limit)),
        },
    };

    match joined {
        Ok(result) => result.into(),
        Err(e) if e.is_panic() => {
            TaskOutcome::Failure(TaskFailure::panicked(panic_message(e.into_panic())))
        }
        Err(e) => TaskOutcome::Failure(TaskFailure::rejected(e.to_string())),
    }
}
