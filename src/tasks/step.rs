//! # Steps: ordered sub-units of a task.
//!
//! A [`Step`] exists only inside its [`Task`](crate::Task); callers describe steps with
//! [`StepSpec`] at creation time and refer to them by index afterwards.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::{Metadata, TaskStatus};
use crate::error::TaskError;

/// Caller-side description of a step, used by [`TaskMonitor::create_task`](crate::TaskMonitor::create_task).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    id: String,
    name: String,
    description: String,
}

impl StepSpec {
    /// Creates a step description with an empty description text.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    /// Returns a new spec with the given description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Snapshot of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    /// Caller-reported progress, always within `0..=100`.
    pub progress: u8,
    /// Set on the first transition to `Running`.
    pub start_time: Option<SystemTime>,
    /// Set on the terminal transition.
    pub end_time: Option<SystemTime>,
    pub error: Option<TaskError>,
    pub metadata: Metadata,
}

impl Step {
    pub(crate) fn from_spec(spec: StepSpec) -> Self {
        Self {
            id: spec.id,
            name: spec.name,
            description: spec.description,
            status: TaskStatus::Pending,
            progress: 0,
            start_time: None,
            end_time: None,
            error: None,
            metadata: Metadata::new(),
        }
    }

    /// Applies a status change, stamping `start_time`/`end_time` as needed.
    ///
    /// Callers validate the transition first.
    pub(crate) fn set_status(&mut self, next: TaskStatus, now: SystemTime) {
        if next == TaskStatus::Running && self.start_time.is_none() {
            self.start_time = Some(now);
        }
        if next.is_terminal() && self.end_time.is_none() {
            self.end_time = Some(self.start_time.map_or(now, |start| now.max(start)));
        }
        self.status = next;
    }
}
