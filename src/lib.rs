pub mod config;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod resolver;
pub mod task;

pub use error::{Error, Result};
pub use orchestration::{CycleReport, Orchestrator, OrchestratorHandle, OrchestratorState};
pub use task::{Task, TaskFailure, TaskOutcome, TaskSet};
