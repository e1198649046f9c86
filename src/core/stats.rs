//! # Aggregate statistics over the registry.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::tasks::{Task, TaskStatus};

/// Counts per status plus the mean execution time of completed tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Pending tasks waiting in the admission queue (subset of `pending`).
    pub queued: usize,
    /// Mean `end_time - start_time` over `Completed` tasks; zero if none completed.
    pub average_execution_time: Duration,
}

impl Stats {
    pub(crate) fn collect<'a>(tasks: impl IntoIterator<Item = &'a Task>, queued: usize) -> Self {
        let mut stats = Stats {
            queued,
            ..Stats::default()
        };
        let mut completed_total = Duration::ZERO;
        let mut completed_timed: u32 = 0;

        for task in tasks {
            stats.total += 1;
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => {
                    stats.completed += 1;
                    if let Some(d) = task.execution_time() {
                        completed_total += d;
                        completed_timed += 1;
                    }
                }
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        if completed_timed > 0 {
            stats.average_execution_time = completed_total / completed_timed;
        }
        stats
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} pending={} (queued={}) running={} completed={} failed={} cancelled={} avg={:?}",
            self.total,
            self.pending,
            self.queued,
            self.running,
            self.completed,
            self.failed,
            self.cancelled,
            self.average_execution_time
        )
    }
}
