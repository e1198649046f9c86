//! # taskmonitor
//!
//! **taskmonitor** is a process-local monitor for long-running, multi-step tasks.
//!
//! The caller does the work; the monitor tracks it. Each task has an ordered list of
//! steps whose reported progress drives task-level progress and a completion estimate.
//! Starts beyond the concurrency cap are queued FIFO and promoted as slots free up.
//! Every state change is published as a typed [`Event`] to filtered subscribers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   create_task / start_task / report_step_progress / cancel_task / ...
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskMonitor (one mutex over the registry)                        │
//! │  - Registry (tasks, steps, lifecycle state machine)               │
//! │  - AdmissionController (running set + FIFO queue)                 │
//! │  - progress engine (mean step progress, linear ETA)               │
//! │  - timers (per-task timeout, CancellationToken-disarmed)          │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   │ dispatch under the lock
//!                    ┌──────────────┴──────────────┐
//!                    ▼                             ▼
//!              SubscriberSet            Bus (broadcast channel)
//!        (Filter per subscription)     (capacity: bus_capacity)
//!                    │                             ▼
//!                    │                   TaskMonitor::events()
//!                    │                     (raw receivers)
//!         ┌──────────┼──────────┐
//!         ▼          ▼          ▼
//!      worker1    worker2    workerN
//!         ▼          ▼          ▼
//!     sub1.on    sub2.on    subN.on
//!     _event()   _event()   _event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! create_task ─► Pending ──start_task──┬─► Running ──all steps Completed──► Completed
//!                   │                  │      │
//!                   │          (cap hit)      ├──fail_step / fail_task──────► Failed
//!                   │                  ▼      │
//!                   │               queued    └──cancel_task / timeout──────► Cancelled
//!                   │                  │
//!                   │   slot freed ────┘ (FIFO promotion)
//!                   └──cancel_task / fail_task──► Cancelled / Failed
//!
//! cleanup(older_than) ─► removes terminal tasks ─► Removed event
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                        |
//! |-------------------|--------------------------------------------------------------|-------------------------------------------|
//! | **Monitor**       | Registry, admission, progress, timeouts, cleanup.            | [`TaskMonitor`], [`MonitorBuilder`]       |
//! | **Tasks**         | Task and step snapshots, creation options.                   | [`Task`], [`Step`], [`TaskOptions`]       |
//! | **Events**        | Typed lifecycle/progress events with task snapshots.         | [`Event`], [`EventKind`]                  |
//! | **Subscriber API**| Filtered subscriptions with isolated, queued delivery.       | [`Subscribe`], [`Filter`], [`SubscriberFn`] |
//! | **Errors**        | Structural errors and recorded failure causes.               | [`MonitorError`], [`TaskError`]           |
//! | **Configuration** | Concurrency cap, bus size, log ring, retention.              | [`MonitorConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber that renders events via `tracing`.
//!
//! ## Example
//! ```rust
//! use taskmonitor::{
//!     EventKind, Filter, MonitorConfig, StepReport, StepSpec, TaskMonitor, TaskOptions,
//!     TaskStatus,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = MonitorConfig::default();
//!     cfg.max_concurrent = 2;
//!     let monitor = TaskMonitor::new(cfg);
//!
//!     monitor.subscribe_fn(Filter::kind(EventKind::Completed), "done", |ev| {
//!         println!("{} finished", ev.task_id);
//!     });
//!
//!     let steps = vec![
//!         StepSpec::new("download", "Download"),
//!         StepSpec::new("verify", "Verify"),
//!     ];
//!     monitor.create_task("sync", "Sync assets", "", steps, TaskOptions::new())?;
//!     monitor.start_task("sync")?;
//!
//!     let running = StepReport::new(40).with_status(TaskStatus::Running);
//!     let task = monitor.report_step_progress("sync", 0, running)?;
//!     assert_eq!(task.progress, 20);
//!
//!     monitor.complete_task("sync", None)?;
//!     println!("{}", monitor.stats());
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Admission, MonitorBuilder, MonitorConfig, StepReport, Stats, TaskMonitor};
pub use error::{MonitorError, TaskError};
pub use events::{Event, EventKind};
pub use subscribers::{Filter, Subscribe, SubscriberFn, SubscriberSet, SubscriptionId};
pub use tasks::{
    DEFAULT_LOG_CAPACITY, DEFAULT_LOG_RETAIN, ErrorCallback, LogBuffer, LogEntry, LogLevel,
    Metadata, Priority, Step, StepSpec, Task, TaskCallback, TaskOptions, TaskStatus,
};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
