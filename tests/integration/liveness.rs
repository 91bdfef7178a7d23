//! Liveness tests.
//!
//! Absent cancellation the orchestrator keeps producing cycles, failures
//! included, and only stops at a pacing delay once asked to.

use std::time::Duration;

use vigil::orchestration::ChannelObserver;
use vigil::{Orchestrator, OrchestratorState};

use super::fixtures::{monitor_set, Behavior};

/// Test: Cycle count keeps growing
/// Given a spawned orchestrator with no cycle limit
/// When the harness waits for N reports
/// Then at least N cycles completed, with contiguous indexes
#[tokio::test(start_paused = true)]
async fn test_cycles_keep_coming() {
    const N: u64 = 25;
    let (tasks, tallies) = monitor_set([
        Behavior::Succeed,
        Behavior::Fail,
        Behavior::Sleep(Duration::from_millis(5)),
        Behavior::Panic,
    ]);
    let (observer, mut rx) = ChannelObserver::channel();
    let handle = Orchestrator::new(tasks, Duration::from_millis(10))
        .with_observer(observer)
        .spawn();

    for expected in 0..N {
        let report = rx.recv().await.expect("orchestrator stopped early");
        assert_eq!(report.index, expected);
    }
    assert!(handle.cycles_completed() >= N);
    assert!(!handle.is_finished());

    handle.shutdown();
    let cycles = handle.join().await.unwrap();
    assert!(cycles >= N);
    assert!(tallies.iter().all(|p| p.invocations() as u64 == cycles));
}

/// Test: Shutdown lands between cycles
/// Given a cycle in flight
/// When shutdown is requested
/// Then the cycle still settles fully before the loop exits
#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_cycle_in_flight() {
    let (tasks, tallies) = monitor_set([
        Behavior::Sleep(Duration::from_secs(3)),
        Behavior::Succeed,
        Behavior::Succeed,
        Behavior::Succeed,
    ]);
    let handle = Orchestrator::new(tasks, Duration::from_secs(1)).spawn();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.state(), OrchestratorState::RunningCycle);
    handle.shutdown();

    let cycles = handle.join().await.unwrap();
    assert_eq!(cycles, 1);
    assert_eq!(tallies[0].settled_at().len(), 1);
}
