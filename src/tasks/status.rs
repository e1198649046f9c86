//! # Status graph shared by tasks and steps.
//!
//! ```text
//! Pending ──► Running ──► Completed
//!    │           ├──────► Failed
//!    │           └──────► Cancelled
//!    └──────────────────► Failed | Cancelled | Completed (steps only)
//! ```
//!
//! Terminal statuses never transition again.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet admitted (or waiting in the queue).
    #[default]
    Pending,
    /// Admitted and executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Stopped by request or timeout.
    Cancelled,
}

impl TaskStatus {
    /// All statuses in display order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    /// `Completed`, `Failed` or `Cancelled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// `Pending` or `Running`.
    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Whether a step may move from `self` to `next`.
    ///
    /// Re-reporting the current non-terminal status is allowed (progress-only update).
    pub fn step_can_become(self, next: TaskStatus) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (TaskStatus::Running, TaskStatus::Pending) => false,
            _ => true,
        }
    }

    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display/ordering hint attached to a task.
///
/// Admission is strictly FIFO; priority never reorders the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}
