//! The long-lived scheduler that runs cycles back to back.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ReportMode};
use crate::task::TaskSet;
use crate::{log, vlog, vlog_debug, vlog_warn, Error, Result};

use super::cycle::run_cycle;
use super::{CycleObserver, JsonObserver, LoggingObserver, RunId};

/// Where the orchestrator is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OrchestratorState {
    /// `run` has not been called yet.
    Idle = 0,
    /// Tasks are launched and not all have settled.
    RunningCycle = 1,
    /// Between cycles, inside the pacing delay.
    AwaitingCycle = 2,
    /// The loop exited after cancellation or its cycle limit.
    Stopped = 3,
}

impl OrchestratorState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => OrchestratorState::Idle,
            1 => OrchestratorState::RunningCycle,
            2 => OrchestratorState::AwaitingCycle,
            _ => OrchestratorState::Stopped,
        }
    }
}

#[derive(Debug)]
struct RunStatus {
    state: AtomicU8,
    cycles: AtomicU64,
}

impl RunStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(OrchestratorState::Idle as u8),
            cycles: AtomicU64::new(0),
        }
    }

    fn set(&self, state: OrchestratorState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn state(&self) -> OrchestratorState {
        OrchestratorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }
}

/// Runs a fixed task set in paced, non-overlapping cycles.
///
/// Every cycle launches all tasks in declared order and waits until each
/// has settled; only then does the pacing delay start. A cycle therefore
/// lasts at least as long as its slowest task plus the pacing delay.
///
/// Without a task timeout a task that never settles stalls the loop for
/// good: no task is invoked again. [`Orchestrator::with_task_timeout`]
/// bounds that by recording an overrun as a failure for the cycle.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use vigil::orchestration::{LoggingObserver, Orchestrator};
/// use vigil::task::{FnTask, TaskSet};
///
/// let tasks = TaskSet::builder()
///     .task(FnTask::new("downloads", || async { Ok(()) }))
///     .build()?;
/// let handle = Orchestrator::new(tasks, Duration::from_secs(1))
///     .with_observer(LoggingObserver)
///     .spawn();
/// // ...
/// handle.shutdown();
/// let cycles = handle.join().await?;
/// ```
pub struct Orchestrator {
    run_id: RunId,
    tasks: TaskSet,
    pacing_delay: Duration,
    task_timeout: Option<Duration>,
    max_cycles: Option<u64>,
    observers: Vec<Arc<dyn CycleObserver>>,
    report_writers: Vec<JoinHandle<()>>,
    status: Arc<RunStatus>,
}

impl Orchestrator {
    pub fn new(tasks: TaskSet, pacing_delay: Duration) -> Self {
        Self {
            run_id: RunId::new(),
            tasks,
            pacing_delay,
            task_timeout: None,
            max_cycles: None,
            observers: Vec::new(),
            report_writers: Vec::new(),
            status: Arc::new(RunStatus::new()),
        }
    }

    /// Build an orchestrator over the configured monitor programs.
    ///
    /// JSON reporting starts its stdout writer here, so that mode needs a
    /// running tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        if config.report == ReportMode::Json && tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::Validation(
                "json reports need a running tokio runtime".to_string(),
            ));
        }
        let mut orchestrator = Self::new(TaskSet::from_config(config)?, config.pacing_delay());
        if let Some(timeout) = config.task_timeout() {
            orchestrator = orchestrator.with_task_timeout(timeout);
        }
        orchestrator = match config.report {
            ReportMode::None => orchestrator,
            ReportMode::Log => orchestrator.with_observer(LoggingObserver),
            ReportMode::Json => orchestrator
                .with_observer(LoggingObserver)
                .with_json_reports(tokio::io::stdout()),
        };
        Ok(orchestrator)
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Stop after `cycles` cycles instead of running until cancelled.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn with_observer(mut self, observer: impl CycleObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Stream each report as a JSON line to `out` from a writer task.
    ///
    /// Must be called inside a tokio runtime. [`Orchestrator::spawn`] waits
    /// for the writer to drain before its handle resolves.
    pub fn with_json_reports<W>(mut self, out: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (observer, writer) = JsonObserver::spawn(out);
        self.report_writers.push(writer);
        self.with_observer(observer)
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    pub fn state(&self) -> OrchestratorState {
        self.status.state()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.status.cycles()
    }

    /// Run cycles until `cancel` fires or the cycle limit is reached.
    ///
    /// Cancellation is only observed between cycles, during the pacing
    /// delay; a cycle in flight always runs to full settlement. Returns the
    /// number of cycles completed. Everything logged from the loop carries
    /// the run id.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        log::scoped(self.run_id.short(), self.run_loop(cancel)).await
    }

    async fn run_loop(&self, cancel: CancellationToken) -> u64 {
        vlog!(
            "Orchestrator starting: tasks={:?} pacing={:?} timeout={:?}",
            self.tasks.names(),
            self.pacing_delay,
            self.task_timeout
        );

        let mut index = 0u64;
        while !self.limit_reached(index) {
            self.status.set(OrchestratorState::RunningCycle);
            let report = run_cycle(self.run_id, index, &self.tasks, self.task_timeout).await;
            self.status.cycles.fetch_add(1, Ordering::SeqCst);
            for observer in &self.observers {
                observer.on_cycle(&report);
            }
            index += 1;

            if self.limit_reached(index) {
                break;
            }

            self.status.set(OrchestratorState::AwaitingCycle);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    vlog_debug!("Orchestrator cancelled");
                    break;
                }
                _ = tokio::time::sleep(self.pacing_delay) => {}
            }
        }

        self.status.set(OrchestratorState::Stopped);
        vlog!("Orchestrator stopped after {} cycles", index);
        index
    }

    fn limit_reached(&self, completed: u64) -> bool {
        let reached = self.max_cycles.is_some_and(|max| completed >= max);
        if reached {
            vlog_debug!("Orchestrator reached its limit of {} cycles", completed);
        }
        reached
    }

    /// Drop the observers and wait for any JSON writer to flush.
    async fn drain_reports(self) {
        let Self {
            observers,
            report_writers,
            ..
        } = self;
        drop(observers);
        for writer in report_writers {
            if let Err(e) = writer.await {
                vlog_warn!("JSON report writer failed: {}", e);
            }
        }
    }

    /// Run on a background tokio task.
    pub fn spawn(self) -> OrchestratorHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let run_id = self.run_id;
        let status = Arc::clone(&self.status);

        vlog_debug!("Orchestrator::spawn {}", run_id.short());
        let join = tokio::spawn(async move {
            let cycles = self.run(cancel_clone).await;
            self.drain_reports().await;
            cycles
        });

        OrchestratorHandle {
            run_id,
            cancel,
            status,
            join,
        }
    }
}

/// Handle to a spawned orchestrator, used for observation and shutdown.
pub struct OrchestratorHandle {
    run_id: RunId,
    cancel: CancellationToken,
    status: Arc<RunStatus>,
    join: JoinHandle<u64>,
}

impl OrchestratorHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Ask the loop to stop at its next pacing delay.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the token that stops this orchestrator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> OrchestratorState {
        self.status.state()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.status.cycles()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Drop the loop immediately, even mid-cycle.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Wait for the loop to exit and return its cycle count.
    pub async fn join(self) -> Result<u64> {
        self.join.await.map_err(|e| Error::TaskJoin(e.to_string()))
    }
}
