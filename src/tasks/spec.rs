//! # Task creation options.
//!
//! Defines [`TaskOptions`], the configuration bundle passed to
//! [`TaskMonitor::create_task`](crate::TaskMonitor::create_task): priority hint, optional
//! timeout, metadata, and convenience callbacks.
//!
//! ## Rules
//! - `priority` is informational; admission stays FIFO.
//! - `timeout` is armed when the task is admitted to `Running`.
//! - `retry_count` is stored on the task but never acted upon by the monitor.
//! - Callbacks are registered as task-filtered subscriptions and released by cleanup.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskmonitor::{Priority, TaskOptions};
//!
//! let opts = TaskOptions::new()
//!     .with_priority(Priority::High)
//!     .with_timeout(Duration::from_secs(30))
//!     .with_metadata("owner", "build-bot")
//!     .on_complete(|task| println!("{} done", task.name));
//! assert_eq!(opts.priority(), Priority::High);
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::{Metadata, Priority, Task};
use crate::error::TaskError;

/// Callback receiving a task snapshot.
pub type TaskCallback = Arc<dyn Fn(&Task) + Send + Sync>;
/// Callback receiving a task snapshot and its failure cause.
pub type ErrorCallback = Arc<dyn Fn(&Task, &TaskError) + Send + Sync>;

/// Options accepted at task creation.
#[derive(Clone, Default)]
pub struct TaskOptions {
    priority: Priority,
    timeout: Option<Duration>,
    retry_count: u32,
    metadata: Metadata,
    pub(crate) on_progress: Option<TaskCallback>,
    pub(crate) on_complete: Option<TaskCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl TaskOptions {
    /// Default options: `Medium` priority, no timeout, no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the auto-cancel deadline. `Duration::ZERO` disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|d| !d.is_zero());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Inserts one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Called with a snapshot after every progress change of this task.
    pub fn on_progress<F>(mut self, f: F) -> Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(f));
        self
    }

    /// Called once when this task completes.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(&Task) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(f));
        self
    }

    /// Called once when this task fails.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&Task, &TaskError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl fmt::Debug for TaskOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskOptions")
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .field("metadata", &self.metadata)
            .field("on_progress", &self.on_progress.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
