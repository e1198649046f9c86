//! Error types used by the task monitor.
//!
//! This module defines two main error enums:
//!
//! - [`MonitorError`]: structural errors returned synchronously to the caller of a
//!   violating operation (unknown id, wrong status, bad step index, duplicate id).
//! - [`TaskError`]: operational causes recorded on a task or step and broadcast with
//!   `Failed` / `Cancelled` events. They are never returned to arbitrary callers.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tasks::TaskStatus;

/// # Errors returned by monitor operations.
///
/// These are programmer errors: the operation was invalid for the current registry
/// state and nothing was changed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// No task is registered under the given id.
    #[error("task '{task}' not found")]
    NotFound {
        /// The unknown task id.
        task: String,
    },

    /// The operation is not valid for the task's (or step's) current status.
    #[error("cannot {op} task '{task}' in status {status}")]
    InvalidState {
        /// Task id.
        task: String,
        /// Status observed when the operation was attempted.
        status: TaskStatus,
        /// Short name of the rejected operation.
        op: &'static str,
    },

    /// Step index outside `[0, total)`.
    #[error("step index {index} out of range for task '{task}' ({total} steps)")]
    IndexOutOfRange {
        /// Task id.
        task: String,
        /// Requested index.
        index: usize,
        /// Number of steps in the task.
        total: usize,
    },

    /// A task with this id already exists.
    #[error("task '{task}' already exists")]
    DuplicateId {
        /// The duplicated id.
        task: String,
    },

    /// A task must be created with at least one step.
    #[error("task '{task}' has no steps")]
    EmptySteps {
        /// Task id.
        task: String,
    },
}

impl MonitorError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskmonitor::MonitorError;
    ///
    /// let err = MonitorError::NotFound { task: "t1".into() };
    /// assert_eq!(err.as_label(), "monitor_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            MonitorError::NotFound { .. } => "monitor_not_found",
            MonitorError::InvalidState { .. } => "monitor_invalid_state",
            MonitorError::IndexOutOfRange { .. } => "monitor_index_out_of_range",
            MonitorError::DuplicateId { .. } => "monitor_duplicate_id",
            MonitorError::EmptySteps { .. } => "monitor_empty_steps",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// # Causes recorded on failed or cancelled tasks.
///
/// Stored as `Task::error` / `Step::error` and carried by `Failed` and `Cancelled` events.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskError {
    /// The task did not reach a terminal status before its deadline.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The configured timeout that elapsed.
        timeout: Duration,
    },

    /// Caller- or step-supplied failure cause.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Explicit cancellation with a reason.
    #[error("cancelled: {reason}")]
    Canceled {
        /// Why the task was cancelled.
        reason: String,
    },
}

impl TaskError {
    /// Creates a [`TaskError::Fail`] from any message.
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Creates a [`TaskError::Canceled`] from any reason.
    pub fn canceled(reason: impl Into<String>) -> Self {
        TaskError::Canceled {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use taskmonitor::TaskError;
    /// use std::time::Duration;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_millis(100) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled { .. } => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled { reason } => format!("cancelled: {reason}"),
        }
    }

    /// True for deadline-driven cancellation.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskError::Timeout { .. })
    }
}
