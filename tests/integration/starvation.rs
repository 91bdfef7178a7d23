//! Starvation tests.
//!
//! Without a per-task timeout a task that never settles holds its cycle
//! open forever, so no task is ever invoked again. A timeout turns the
//! hang into a failure for that cycle and the loop carries on.

use std::time::Duration;

use tokio_test::{assert_pending, task};

use vigil::orchestration::ChannelObserver;
use vigil::task::{FailureKind, Task};
use vigil::{Orchestrator, OrchestratorState};

use super::fixtures::{monitor_set, Behavior, ScriptedTask};

/// Test: The hang fixture really never settles
#[tokio::test]
async fn test_hanging_task_stays_pending() {
    let (hang, tally) = ScriptedTask::new("achievements", Behavior::Hang);
    let mut fut = task::spawn(hang.run());
    assert_pending!(fut.poll());
    assert_pending!(fut.poll());
    assert_eq!(tally.invocations(), 1);
}

/// Test: A hung task starves every other task
/// Given one task that never settles and no timeout
/// When an hour of virtual time passes
/// Then each task was invoked once and no cycle ever completed
#[tokio::test(start_paused = true)]
async fn test_hung_task_starves_siblings() {
    let (tasks, tallies) = monitor_set([
        Behavior::Succeed,
        Behavior::Hang,
        Behavior::Fail,
        Behavior::Sleep(Duration::from_millis(100)),
    ]);
    let (observer, mut rx) = ChannelObserver::channel();
    let handle = Orchestrator::new(tasks, Duration::from_millis(10))
        .with_observer(observer)
        .spawn();

    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert!(tallies.iter().all(|p| p.invocations() == 1));
    assert_eq!(handle.cycles_completed(), 0);
    assert_eq!(handle.state(), OrchestratorState::RunningCycle);
    assert!(rx.try_recv().is_err());

    // Cancellation is only honored between cycles, so it cannot help.
    handle.shutdown();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(!handle.is_finished());
    assert!(tallies.iter().all(|p| p.invocations() == 1));

    handle.abort();
}

/// Test: A timeout keeps the loop alive
/// Given the same hung task and a 1s per-task timeout
/// When time passes
/// Then siblings keep being invoked and the hang is reported each cycle
#[tokio::test(start_paused = true)]
async fn test_timeout_prevents_starvation() {
    let (tasks, tallies) = monitor_set([
        Behavior::Succeed,
        Behavior::Hang,
        Behavior::Fail,
        Behavior::Sleep(Duration::from_millis(100)),
    ]);
    let (observer, mut rx) = ChannelObserver::channel();
    let handle = Orchestrator::new(tasks, Duration::from_millis(10))
        .with_task_timeout(Duration::from_secs(1))
        .with_observer(observer)
        .spawn();

    for _ in 0..5 {
        let report = rx.recv().await.unwrap();
        let hung = report.outcomes[1].outcome.failure().unwrap();
        assert_eq!(hung.kind, FailureKind::TimedOut);
        assert!(report.outcomes[0].outcome.is_success());
    }

    handle.shutdown();
    let cycles = handle.join().await.unwrap();
    assert!(cycles >= 5);
    assert!(tallies.iter().all(|p| p.invocations() as u64 == cycles));
}
