//! Hooks that receive each cycle's outcome vector.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{vlog_debug, vlog_warn};

use super::CycleReport;

/// Called once per cycle, after every task has settled.
///
/// Observers run on the orchestrator's thread of control between settlement
/// and the pacing delay, so they should return quickly.
pub trait CycleObserver: Send + Sync {
    fn on_cycle(&self, report: &CycleReport);
}

impl<F> CycleObserver for F
where
    F: Fn(&CycleReport) + Send + Sync,
{
    fn on_cycle(&self, report: &CycleReport) {
        self(report)
    }
}

/// Writes failed tasks to the vigil log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl CycleObserver for LoggingObserver {
    fn on_cycle(&self, report: &CycleReport) {
        for (name, failure) in report.failures() {
            vlog_warn!("cycle {} task {} {}", report.index, name, failure);
        }
        vlog_debug!(
            "cycle {} settled: {}/{} ok in {:?}",
            report.index,
            report.succeeded(),
            report.outcomes.len(),
            report.duration()
        );
    }
}

/// Streams every report as one JSON line.
///
/// Serialization and I/O happen on a dedicated writer task; `on_cycle`
/// only queues the report, so the orchestrator never blocks on the output.
/// The writer drains the queue and exits once the observer is dropped. It
/// stops writing after the first I/O error.
pub struct JsonObserver {
    tx: mpsc::UnboundedSender<CycleReport>,
}

impl JsonObserver {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn<W>(out: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<CycleReport>();
        let writer = tokio::spawn(async move {
            let mut out = out;
            while let Some(report) = rx.recv().await {
                if let Err(e) = write_line(&mut out, &report).await {
                    vlog_warn!("cycle {} report write failed: {}", report.index, e);
                    break;
                }
            }
        });
        (Self { tx }, writer)
    }
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, report: &CycleReport) -> io::Result<()> {
    let mut line = serde_json::to_vec(report)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await
}

impl CycleObserver for JsonObserver {
    fn on_cycle(&self, report: &CycleReport) {
        if self.tx.send(report.clone()).is_err() {
            vlog_warn!("cycle {} report dropped: JSON writer stopped", report.index);
        }
    }
}

/// Forwards reports to an async consumer.
///
/// A closed receiver is ignored; the orchestrator keeps running.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<CycleReport>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<CycleReport>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CycleReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl CycleObserver for ChannelObserver {
    fn on_cycle(&self, report: &CycleReport) {
        let _ = self.tx.send(report.clone());
    }
}
