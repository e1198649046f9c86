//! # Task: the aggregate root tracked by the monitor.
//!
//! A [`Task`] owns a fixed, non-empty list of [`Step`]s. Everything a caller receives
//! from the monitor is an owned snapshot; mutation happens only inside the registry.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use super::{LogBuffer, Metadata, Priority, Step, StepSpec, TaskOptions, TaskStatus};
use crate::error::{MonitorError, TaskError};

/// Snapshot of a tracked task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    /// Display hint only; admission order is FIFO.
    pub priority: Priority,
    /// Rounded mean of step progress (derived).
    pub progress: u8,
    /// Index of the step most recently reported `Running`.
    pub current_step_index: usize,
    pub steps: Vec<Step>,
    pub created_at: SystemTime,
    /// Set when the task is admitted to `Running`.
    pub start_time: Option<SystemTime>,
    /// Linear extrapolation, recomputed on every progress update once progress > 0.
    pub estimated_end_time: Option<SystemTime>,
    /// Set exactly once, on the terminal transition.
    pub end_time: Option<SystemTime>,
    pub error: Option<TaskError>,
    pub metadata: Metadata,
    pub timeout: Option<Duration>,
    /// Stored for consumers; the monitor never retries.
    pub retry_count: u32,
    pub logs: LogBuffer,
}

impl Task {
    /// Builds a `Pending` task from its step descriptions.
    ///
    /// Fails with [`MonitorError::EmptySteps`] when `steps` is empty.
    pub(crate) fn new(
        id: String,
        name: String,
        description: String,
        steps: Vec<StepSpec>,
        options: &TaskOptions,
        logs: LogBuffer,
        now: SystemTime,
    ) -> Result<Self, MonitorError> {
        if steps.is_empty() {
            return Err(MonitorError::EmptySteps { task: id });
        }
        Ok(Self {
            id,
            name,
            description,
            status: TaskStatus::Pending,
            priority: options.priority(),
            progress: 0,
            current_step_index: 0,
            steps: steps.into_iter().map(Step::from_spec).collect(),
            created_at: now,
            start_time: None,
            estimated_end_time: None,
            end_time: None,
            error: None,
            metadata: options.metadata().clone(),
            timeout: options.timeout(),
            retry_count: options.retry_count(),
            logs,
        })
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.current_step_index)
    }

    /// Whether every step reached `Completed`.
    pub fn all_steps_completed(&self) -> bool {
        self.steps.iter().all(|s| s.status == TaskStatus::Completed)
    }

    /// Time spent since start (until `end_time` for finished tasks).
    pub fn elapsed(&self, now: SystemTime) -> Option<Duration> {
        let start = self.start_time?;
        let until = self.end_time.unwrap_or(now);
        Some(until.duration_since(start).unwrap_or_default())
    }

    /// `end_time - start_time` for tasks that ran and finished.
    pub fn execution_time(&self) -> Option<Duration> {
        let (start, end) = (self.start_time?, self.end_time?);
        Some(end.duration_since(start).unwrap_or_default())
    }

    /// Estimated time remaining, if an estimate exists and the task is still running.
    pub fn eta(&self, now: SystemTime) -> Option<Duration> {
        if self.is_terminal() {
            return None;
        }
        let end = self.estimated_end_time?;
        Some(end.duration_since(now).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(n: usize) -> Vec<StepSpec> {
        (0..n)
            .map(|i| StepSpec::new(format!("s{i}"), format!("step {i}")))
            .collect()
    }

    #[test]
    fn test_new_task_is_pending() {
        let now = SystemTime::now();
        let opts = TaskOptions::new()
            .with_priority(Priority::Critical)
            .with_metadata("k", 1);
        let task = Task::new(
            "t1".into(),
            "build".into(),
            String::new(),
            steps(3),
            &opts,
            LogBuffer::default(),
            now,
        )
        .expect("valid task");

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.total_steps(), 3);
        assert_eq!(task.priority, Priority::Critical);
        assert_eq!(task.metadata.get("k"), Some(&serde_json::json!(1)));
        assert!(task.start_time.is_none());
        assert!(task.steps.iter().all(|s| s.status == TaskStatus::Pending));
    }

    #[test]
    fn test_empty_steps_rejected() {
        let err = Task::new(
            "t1".into(),
            "x".into(),
            String::new(),
            Vec::new(),
            &TaskOptions::default(),
            LogBuffer::default(),
            SystemTime::now(),
        )
        .unwrap_err();
        assert_eq!(err, MonitorError::EmptySteps { task: "t1".into() });
    }

    #[test]
    fn test_eta_from_estimate() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let mut task = Task::new(
            "t1".into(),
            "x".into(),
            String::new(),
            steps(1),
            &TaskOptions::default(),
            LogBuffer::default(),
            start,
        )
        .expect("valid task");
        task.status = TaskStatus::Running;
        task.start_time = Some(start);
        task.estimated_end_time = Some(start + Duration::from_secs(40));

        let now = start + Duration::from_secs(10);
        assert_eq!(task.eta(now), Some(Duration::from_secs(30)));
        assert_eq!(task.elapsed(now), Some(Duration::from_secs(10)));

        task.status = TaskStatus::Completed;
        assert_eq!(task.eta(now), None);
    }
}
