//! Adapters that turn collaborator functions into [`Task`]s.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use super::{Task, TaskFailure, TaskResult};

/// A task backed by an async closure.
///
/// # Example
///
/// ```
/// use vigil::task::{FnTask, Task, TaskFailure};
///
/// let task = FnTask::new("update-check", || async { Ok::<(), TaskFailure>(()) });
/// assert_eq!(task.name(), "update-check");
/// ```
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> Task for FnTask<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> BoxFuture<'_, TaskResult> {
        (self.f)().boxed()
    }
}

/// A task backed by a synchronous function.
///
/// The function runs on tokio's blocking pool so a slow collaborator (a
/// process table scan, say) never stalls the orchestrator's own thread.
pub struct BlockingTask<F> {
    name: String,
    f: Arc<F>,
}

impl<F> BlockingTask<F>
where
    F: Fn() -> TaskResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

impl<F> Task for BlockingTask<F>
where
    F: Fn() -> TaskResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> BoxFuture<'_, TaskResult> {
        let f = Arc::clone(&self.f);
        async move {
            match tokio::task::spawn_blocking(move || (*f)()).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(TaskFailure::panicked(panic_message(e.into_panic()))),
                Err(e) => Err(TaskFailure::rejected(e.to_string())),
            }
        }
        .boxed()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
