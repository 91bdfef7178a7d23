//! The orchestration loop.
//!
//! An [`Orchestrator`] runs every task of a fixed [`TaskSet`] concurrently,
//! waits for all of them to settle, pauses for the pacing delay and starts
//! over. A task's failure is recorded as data in the cycle's
//! [`CycleReport`] and never stops its siblings or later cycles.
//!
//! [`TaskSet`]: crate::task::TaskSet

mod cycle;
mod observer;
mod orchestrator;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use cycle::{CycleReport, TaskReport};
pub use observer::{ChannelObserver, CycleObserver, JsonObserver, LoggingObserver};
pub use orchestrator::{Orchestrator, OrchestratorHandle, OrchestratorState};

/// Identifies one orchestrator run in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
