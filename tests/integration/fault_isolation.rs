//! Fault isolation tests.
//!
//! A failing, panicking or overrunning task must never stop its siblings
//! from running in the same cycle, and must itself be invoked again in
//! every later cycle.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vigil::orchestration::ChannelObserver;
use vigil::task::FailureKind;
use vigil::Orchestrator;

use super::fixtures::{monitor_set, Behavior};

/// Test: A task that always fails
/// Given 4 tasks where #2 always rejects
/// When 3 cycles run
/// Then all four tasks ran exactly 3 times
#[tokio::test(start_paused = true)]
async fn test_failing_task_does_not_skip_siblings() {
    let (tasks, tallies) = monitor_set([
        Behavior::Succeed,
        Behavior::Fail,
        Behavior::Succeed,
        Behavior::Succeed,
    ]);

    let cycles = Orchestrator::new(tasks, Duration::from_millis(500))
        .with_max_cycles(3)
        .run(CancellationToken::new())
        .await;

    assert_eq!(cycles, 3);
    for (i, tally) in tallies.iter().enumerate() {
        assert_eq!(tally.invocations(), 3, "task #{} ran {} times", i + 1, tally.invocations());
    }
}

/// Test: Outcome vector carries each failure in its own slot
#[tokio::test(start_paused = true)]
async fn test_outcome_vector_per_cycle() {
    let (tasks, _tallies) = monitor_set([
        Behavior::Succeed,
        Behavior::Fail,
        Behavior::Panic,
        Behavior::Sleep(Duration::from_millis(50)),
    ]);
    let (observer, mut rx) = ChannelObserver::channel();

    Orchestrator::new(tasks, Duration::from_millis(100))
        .with_max_cycles(2)
        .with_observer(observer)
        .run(CancellationToken::new())
        .await;

    for expected_index in 0..2 {
        let report = rx.recv().await.expect("one report per cycle");
        assert_eq!(report.index, expected_index);
        assert_eq!(report.outcomes.len(), 4);
        assert!(report.outcomes[0].outcome.is_success());
        assert_eq!(
            report.outcomes[1].outcome.failure().map(|f| f.kind),
            Some(FailureKind::Rejected)
        );
        assert_eq!(
            report.outcomes[2].outcome.failure().map(|f| f.kind),
            Some(FailureKind::Panicked)
        );
        assert!(report.outcomes[3].outcome.is_success());
        assert!(!report.is_clean());
    }
    assert!(rx.try_recv().is_err());
}

/// Test: Panicking task keeps being invoked
#[tokio::test(start_paused = true)]
async fn test_panicking_task_runs_every_cycle() {
    let (tasks, tallies) = monitor_set([
        Behavior::Panic,
        Behavior::Succeed,
        Behavior::Succeed,
        Behavior::Succeed,
    ]);

    Orchestrator::new(tasks, Duration::from_millis(10))
        .with_max_cycles(4)
        .run(CancellationToken::new())
        .await;

    assert!(tallies.iter().all(|p| p.invocations() == 4));
    // The panicking task never reaches its settlement record.
    assert!(tallies[0].settled_at().is_empty());
    assert_eq!(tallies[1].settled_at().len(), 4);
}

/// Test: With a timeout, an overrunning task is a failure, not a stall
#[tokio::test(start_paused = true)]
async fn test_timeout_turns_overrun_into_failure() {
    let (tasks, tallies) = monitor_set([
        Behavior::Succeed,
        Behavior::Sleep(Duration::from_secs(30)),
        Behavior::Succeed,
        Behavior::Succeed,
    ]);
    let (observer, mut rx) = ChannelObserver::channel();

    Orchestrator::new(tasks, Duration::from_millis(100))
        .with_task_timeout(Duration::from_secs(1))
        .with_max_cycles(3)
        .with_observer(observer)
        .run(CancellationToken::new())
        .await;

    assert!(tallies.iter().all(|p| p.invocations() == 3));
    let report = rx.recv().await.unwrap();
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "processes");
    assert_eq!(failures[0].1.kind, FailureKind::TimedOut);
}
