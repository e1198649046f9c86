//! # Task and step data model.
//!
//! This module provides the core task-related types:
//! - [`Task`] - snapshot of a tracked task (aggregate root)
//! - [`Step`] / [`StepSpec`] - ordered sub-units and their creation-time description
//! - [`TaskStatus`] / [`Priority`] - status graph and display hint
//! - [`TaskOptions`] - creation options (timeout, metadata, callbacks)
//! - [`LogBuffer`] - per-task bounded log

mod log;
mod spec;
mod status;
mod step;
mod task;

pub use log::{DEFAULT_LOG_CAPACITY, DEFAULT_LOG_RETAIN, LogBuffer, LogEntry, LogLevel};
pub use spec::{ErrorCallback, TaskCallback, TaskOptions};
pub use status::{Priority, TaskStatus};
pub use step::{Step, StepSpec};
pub use task::Task;

/// Free-form key/value bag attached to tasks and steps.
pub type Metadata = serde_json::Map<String, serde_json::Value>;
