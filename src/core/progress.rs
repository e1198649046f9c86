//! # Progress engine.
//!
//! Derives task-level progress and the completion estimate from step progress.
//!
//! ```text
//! progress          = round(sum(step.progress) / total_steps)
//! estimated_end     = start_time + elapsed / progress * 100      (progress > 0)
//! ```
//!
//! The estimate is a plain linear extrapolation: accurate only when steps take similar
//! time. No smoothing is applied.

use std::time::SystemTime;

use serde_json::Value;

use crate::tasks::{Metadata, Step, Task, TaskStatus};

/// A progress report for one step, passed to
/// [`TaskMonitor::report_step_progress`](crate::TaskMonitor::report_step_progress).
///
/// ```rust
/// use taskmonitor::{StepReport, TaskStatus};
///
/// let report = StepReport::new(140).with_status(TaskStatus::Running);
/// assert_eq!(report.progress(), 100);
/// assert_eq!(StepReport::new(-5).progress(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    progress: u8,
    status: Option<TaskStatus>,
    metadata: Metadata,
}

impl StepReport {
    /// Creates a report; `progress` is clamped to `0..=100`.
    pub fn new(progress: i64) -> Self {
        Self {
            progress: progress.clamp(0, 100) as u8,
            status: None,
            metadata: Metadata::new(),
        }
    }

    /// Also moves the step to `status`.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Merges one entry into the step metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> Option<TaskStatus> {
        self.status
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Rounded mean of step progress (half rounds up).
pub(crate) fn average_progress(steps: &[Step]) -> u8 {
    if steps.is_empty() {
        return 0;
    }
    let sum: u64 = steps.iter().map(|s| u64::from(s.progress)).sum();
    let n = steps.len() as u64;
    ((sum * 2 + n) / (n * 2)).min(100) as u8
}

/// Linear completion estimate, `None` while no progress was made.
pub(crate) fn estimate_end(start: SystemTime, now: SystemTime, progress: u8) -> Option<SystemTime> {
    if progress == 0 {
        return None;
    }
    let elapsed = now.duration_since(start).unwrap_or_default();
    let total = elapsed.mul_f64(100.0 / f64::from(progress));
    start.checked_add(total)
}

/// Recomputes `progress` and, once progress is positive, `estimated_end_time`.
pub(crate) fn recompute(task: &mut Task, now: SystemTime) {
    task.progress = average_progress(&task.steps);
    let estimate = task
        .start_time
        .and_then(|start| estimate_end(start, now, task.progress));
    if estimate.is_some() {
        task.estimated_end_time = estimate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::StepSpec;
    use std::time::Duration;

    fn steps_with(progress: &[u8]) -> Vec<Step> {
        progress
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut s = Step::from_spec(StepSpec::new(format!("s{i}"), "step"));
                s.progress = *p;
                s
            })
            .collect()
    }

    #[test]
    fn test_average_rounds_half_up() {
        assert_eq!(average_progress(&steps_with(&[0, 0, 0])), 0);
        assert_eq!(average_progress(&steps_with(&[100, 0, 0])), 33);
        assert_eq!(average_progress(&steps_with(&[100, 100, 0])), 67);
        assert_eq!(average_progress(&steps_with(&[1, 0])), 1, "0.5 rounds up");
        assert_eq!(average_progress(&steps_with(&[50, 50, 50, 51])), 50);
        assert_eq!(average_progress(&steps_with(&[100, 100])), 100);
    }

    #[test]
    fn test_estimate_is_linear() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let now = start + Duration::from_secs(10);
        assert_eq!(estimate_end(start, now, 0), None);
        assert_eq!(
            estimate_end(start, now, 25),
            Some(start + Duration::from_secs(40))
        );
        assert_eq!(
            estimate_end(start, now, 100),
            Some(start + Duration::from_secs(10))
        );
    }

    #[test]
    fn test_report_clamps() {
        assert_eq!(StepReport::new(250).progress(), 100);
        assert_eq!(StepReport::new(-1).progress(), 0);
        assert_eq!(StepReport::new(42).progress(), 42);
        let r = StepReport::new(10).with_metadata("bytes", 1024);
        assert_eq!(r.metadata().get("bytes"), Some(&serde_json::json!(1024)));
    }
}
