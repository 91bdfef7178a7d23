//! The fixed, ordered collection of tasks an orchestrator runs.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::{Error, Result};

use super::{CommandTask, Task};

/// An immutable, ordered set of uniquely named tasks.
///
/// Order is launch order within a cycle; it says nothing about which task
/// settles first. Once built, the set cannot grow or shrink.
#[derive(Clone)]
pub struct TaskSet {
    tasks: Arc<[Arc<dyn Task>]>,
}

impl TaskSet {
    pub fn builder() -> TaskSetBuilder {
        TaskSetBuilder::default()
    }

    /// Build a set of [`CommandTask`]s from the configured monitors. Each
    /// one kills its program at the configured task timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder();
        for spec in &config.monitors {
            let task = CommandTask::from_spec(spec)?.with_timeout(config.task_timeout());
            builder = builder.task(task);
        }
        builder.build()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tasks.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }
}

impl std::fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSet")
            .field("tasks", &self.names())
            .finish()
    }
}

#[derive(Default)]
pub struct TaskSetBuilder {
    tasks: Vec<Arc<dyn Task>>,
}

impl TaskSetBuilder {
    pub fn task(self, task: impl Task + 'static) -> Self {
        self.shared(Arc::new(task))
    }

    /// Register a task the caller keeps a handle to.
    pub fn shared(mut self, task: Arc<dyn Task>) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn build(self) -> Result<TaskSet> {
        if self.tasks.is_empty() {
            return Err(Error::EmptyTaskSet);
        }
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name()) {
                return Err(Error::DuplicateTask(task.name().to_string()));
            }
        }
        Ok(TaskSet {
            tasks: self.tasks.into(),
        })
    }
}
