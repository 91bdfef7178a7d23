//! Pacing and cycle ordering tests.
//!
//! A cycle starts only after the previous cycle fully settled and the
//! pacing delay elapsed; the gap between cycle starts is at least the
//! slowest task plus the pacing delay.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use vigil::orchestration::ChannelObserver;
use vigil::{CycleReport, Orchestrator};

use super::fixtures::{monitor_set, Behavior};

const PACING: Duration = Duration::from_secs(1);
/// Slack for timer rounding on the paused clock.
const SLACK: Duration = Duration::from_millis(20);

async fn run_paced(behaviors: [Behavior; 4], cycles: u64) -> (Vec<CycleReport>, Vec<super::fixtures::Tally>) {
    let (tasks, tallies) = monitor_set(behaviors);
    let (observer, mut rx) = ChannelObserver::channel();

    Orchestrator::new(tasks, PACING)
        .with_max_cycles(cycles)
        .with_observer(observer)
        .run(CancellationToken::new())
        .await;

    let mut reports = Vec::new();
    while let Ok(report) = rx.try_recv() {
        reports.push(report);
    }
    (reports, tallies)
}

/// Test: No cycle overlap
/// Given tasks of uneven duration
/// When several cycles run
/// Then every invocation of cycle k+1 comes after every settlement of
/// cycle k plus the pacing delay
#[tokio::test(start_paused = true)]
async fn test_cycles_never_overlap() {
    let (reports, tallies) = run_paced(
        [
            Behavior::Sleep(Duration::from_millis(200)),
            Behavior::Sleep(Duration::from_millis(700)),
            Behavior::Succeed,
            Behavior::Sleep(Duration::from_millis(50)),
        ],
        4,
    )
    .await;
    assert_eq!(reports.len(), 4);

    for k in 0..3 {
        let last_settlement = tallies
            .iter()
            .map(|p| p.settled_at()[k])
            .max()
            .unwrap();
        let first_invocation = tallies
            .iter()
            .map(|p| p.invoked_at()[k + 1])
            .min()
            .unwrap();
        assert!(
            first_invocation >= last_settlement + PACING,
            "cycle {} launched {:?} after cycle {} settled",
            k + 1,
            first_invocation - last_settlement,
            k
        );
        assert!(reports[k + 1].launched >= reports[k].settled + PACING);
    }
}

/// Test: Pacing lower bound
/// Given a slowest task of T
/// When consecutive cycles run
/// Then the gap between cycle starts is T + pacing (plus timer slack)
#[tokio::test(start_paused = true)]
async fn test_gap_is_slowest_task_plus_pacing() {
    let slowest = Duration::from_millis(400);
    let (reports, _) = run_paced(
        [
            Behavior::Sleep(Duration::from_millis(100)),
            Behavior::Sleep(slowest),
            Behavior::Fail,
            Behavior::Succeed,
        ],
        3,
    )
    .await;

    for pair in reports.windows(2) {
        let gap = pair[1].launched - pair[0].launched;
        assert!(gap >= slowest + PACING, "gap {:?} too short", gap);
        assert!(gap < slowest + PACING + SLACK, "gap {:?} too long", gap);
    }
}

/// Test: Launch order follows the task set
#[tokio::test(start_paused = true)]
async fn test_launch_order_is_declared_order() {
    let (_, tallies) = run_paced(
        [
            Behavior::Sleep(Duration::from_millis(30)),
            Behavior::Succeed,
            Behavior::Sleep(Duration::from_millis(10)),
            Behavior::Fail,
        ],
        2,
    )
    .await;

    let order = ["downloads", "processes", "achievements", "updates"];
    let expected: Vec<String> = order.iter().chain(order.iter()).map(|s| s.to_string()).collect();
    assert_eq!(tallies[0].launch_log(), expected);
}
