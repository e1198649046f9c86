//! # Monitor events.
//!
//! The [`EventKind`] enum classifies what happened to a task:
//! - **Lifecycle**: `Created`, `Queued`, `Started`, `Completed`, `Failed`, `Cancelled`
//! - **Progress**: `Progress` after every step update
//! - **Housekeeping**: `Log` (new log line), `Removed` (evicted by cleanup)
//!
//! Every [`Event`] carries an immutable snapshot of the task taken while the registry
//! lock was held, so a subscriber never sees state newer than the change it observes.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically
//! in the order state changes were applied.
//!
//! ## Example
//! ```rust
//! use taskmonitor::{Event, EventKind};
//!
//! fn describe(ev: &Event) -> String {
//!     match ev.kind {
//!         EventKind::Progress => format!("{} at {}%", ev.task_id, ev.task.progress),
//!         EventKind::Failed => format!("{} failed: {:?}", ev.task_id, ev.error),
//!         other => format!("{} {}", ev.task_id, other),
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::TaskError;
use crate::subscribers::SubscriptionId;
use crate::tasks::{LogEntry, Task};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of monitor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Task registered in `Pending`.
    Created,

    /// `start_task` deferred the task: the concurrency cap is reached.
    ///
    /// Sets:
    /// - `queue_position`: 0-based position in the FIFO
    Queued,

    /// Task admitted to `Running` (directly or promoted from the queue).
    Started,

    /// A step update changed task progress/status.
    Progress,

    /// Every step completed.
    Completed,

    /// Task failed.
    ///
    /// Sets:
    /// - `error`: failure cause
    Failed,

    /// Task cancelled explicitly or by timeout.
    ///
    /// Sets:
    /// - `error`: reason, when one was given (always set for timeouts)
    Cancelled,

    /// A line was appended to the task log.
    ///
    /// Sets:
    /// - `log`: the appended entry
    Log,

    /// Task evicted from the registry by cleanup.
    Removed,
}

impl EventKind {
    /// Stable snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Queued => "queued",
            EventKind::Started => "started",
            EventKind::Progress => "progress",
            EventKind::Completed => "completed",
            EventKind::Failed => "failed",
            EventKind::Cancelled => "cancelled",
            EventKind::Log => "log",
            EventKind::Removed => "removed",
        }
    }

    /// `Completed`, `Failed` or `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            EventKind::Completed | EventKind::Failed | EventKind::Cancelled
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Monitor event with a task snapshot.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Id of the task this event is about.
    pub task_id: Arc<str>,
    /// Task state at the moment the event was produced.
    pub task: Arc<Task>,
    /// Failure or cancellation cause.
    pub error: Option<TaskError>,
    /// Position in the admission queue (only for `Queued`).
    pub queue_position: Option<usize>,
    /// Appended log entry (only for `Log`).
    pub log: Option<LogEntry>,

    /// Subscriptions to release once this event is fanned out (only for `Removed`).
    pub(crate) released: Vec<SubscriptionId>,
}

impl Event {
    /// Creates a new event of the given kind from a task snapshot.
    pub fn new(kind: EventKind, task: Task, at: SystemTime) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at,
            kind,
            task_id: Arc::from(task.id.as_str()),
            task: Arc::new(task),
            error: None,
            queue_position: None,
            log: None,
            released: Vec::new(),
        }
    }

    /// Attaches a failure/cancellation cause.
    #[inline]
    pub fn with_error(mut self, error: TaskError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches a queue position.
    #[inline]
    pub fn with_queue_position(mut self, position: usize) -> Self {
        self.queue_position = Some(position);
        self
    }

    /// Attaches a log entry.
    #[inline]
    pub fn with_log(mut self, entry: LogEntry) -> Self {
        self.log = Some(entry);
        self
    }

    #[inline]
    pub(crate) fn with_released(mut self, subs: Vec<SubscriptionId>) -> Self {
        self.released = subs;
        self
    }
}
