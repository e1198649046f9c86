//! # LogWriter: leveled event printer
//!
//! A minimal subscriber that renders every [`Event`] as one `tracing` line, using the
//! level that matches the event (failures at `error`, cancellations at `warn`, progress
//! at `debug`, the rest at `info`). Install a `tracing` subscriber to see the output.
//!
//! ## Example output
//! ```text
//! INFO  [created] task="build" steps=3 priority=High
//! INFO  [started] task="build"
//! DEBUG [progress] task="build" progress=33 step=0 eta_ms=2000
//! INFO  [queued] task="lint" position=0
//! ERROR [failed] task="build" err="execution failed: compile error"
//! WARN  [cancelled] task="lint" reason="timed out after 100ms"
//! INFO  [completed] task="test" elapsed_ms=1200
//! ```

use std::time::SystemTime;

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use crate::tasks::LogLevel;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = &*e.task_id;
        match e.kind {
            EventKind::Created => {
                tracing::info!(
                    "[created] task={task:?} steps={} priority={:?}",
                    e.task.total_steps(),
                    e.task.priority
                );
            }
            EventKind::Queued => {
                tracing::info!("[queued] task={task:?} position={:?}", e.queue_position);
            }
            EventKind::Started => {
                tracing::info!("[started] task={task:?}");
            }
            EventKind::Progress => {
                let eta_ms = e.task.eta(SystemTime::now()).map(|d| d.as_millis());
                tracing::debug!(
                    "[progress] task={task:?} progress={} step={} eta_ms={eta_ms:?}",
                    e.task.progress,
                    e.task.current_step_index
                );
            }
            EventKind::Completed => {
                let elapsed_ms = e.task.execution_time().map(|d| d.as_millis());
                tracing::info!("[completed] task={task:?} elapsed_ms={elapsed_ms:?}");
            }
            EventKind::Failed => {
                let err = e.error.as_ref().map(ToString::to_string);
                tracing::error!("[failed] task={task:?} err={err:?}");
            }
            EventKind::Cancelled => {
                let reason = e.error.as_ref().map(ToString::to_string);
                tracing::warn!("[cancelled] task={task:?} reason={reason:?}");
            }
            EventKind::Log => {
                if let Some(entry) = &e.log {
                    let msg = &entry.message;
                    match entry.level {
                        LogLevel::Debug => tracing::debug!("[log] task={task:?} {msg}"),
                        LogLevel::Info => tracing::info!("[log] task={task:?} {msg}"),
                        LogLevel::Warn => tracing::warn!("[log] task={task:?} {msg}"),
                        LogLevel::Error => tracing::error!("[log] task={task:?} {msg}"),
                    }
                }
            }
            EventKind::Removed => {
                tracing::debug!("[removed] task={task:?}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}
