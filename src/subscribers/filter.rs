//! # Subscription filters.
//!
//! A [`Filter`] selects which events reach a subscriber: everything, one
//! [`EventKind`], one task id, or one kind for one task.
//!
//! ```rust
//! use taskmonitor::{EventKind, Filter};
//!
//! let all = Filter::all();
//! let failures = Filter::kind(EventKind::Failed);
//! let one_task = Filter::task("deploy");
//! let one_task_progress = Filter::task("deploy").with_kind(EventKind::Progress);
//! # let _ = (all, failures, one_task, one_task_progress);
//! ```

use std::sync::Arc;

use crate::events::{Event, EventKind};

/// Event selector attached to a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    kind: Option<EventKind>,
    task: Option<Arc<str>>,
}

impl Filter {
    /// Matches every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches events of one kind, for any task.
    pub fn kind(kind: EventKind) -> Self {
        Self {
            kind: Some(kind),
            task: None,
        }
    }

    /// Matches every event of one task.
    pub fn task(task_id: impl Into<Arc<str>>) -> Self {
        Self {
            kind: None,
            task: Some(task_id.into()),
        }
    }

    /// Narrows the filter to one kind.
    pub fn with_kind(mut self, kind: EventKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Narrows the filter to one task.
    pub fn with_task(mut self, task_id: impl Into<Arc<str>>) -> Self {
        self.task = Some(task_id.into());
        self
    }

    /// Task id this filter is bound to, if any.
    pub fn task_id(&self) -> Option<&str> {
        self.task.as_deref()
    }

    pub fn matches(&self, ev: &Event) -> bool {
        self.kind.is_none_or(|k| k == ev.kind)
            && self.task.as_deref().is_none_or(|t| t == &*ev.task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{LogBuffer, StepSpec, Task, TaskOptions};
    use std::time::SystemTime;

    fn event(kind: EventKind, id: &str) -> Event {
        let task = Task::new(
            id.into(),
            id.into(),
            String::new(),
            vec![StepSpec::new("s0", "only")],
            &TaskOptions::default(),
            LogBuffer::default(),
            SystemTime::now(),
        )
        .expect("valid task");
        Event::new(kind, task, SystemTime::now())
    }

    #[test]
    fn test_filter_matching() {
        let progress_a = event(EventKind::Progress, "a");
        let failed_b = event(EventKind::Failed, "b");

        assert!(Filter::all().matches(&progress_a));
        assert!(Filter::all().matches(&failed_b));

        assert!(Filter::kind(EventKind::Failed).matches(&failed_b));
        assert!(!Filter::kind(EventKind::Failed).matches(&progress_a));

        assert!(Filter::task("a").matches(&progress_a));
        assert!(!Filter::task("a").matches(&failed_b));

        let narrow = Filter::task("a").with_kind(EventKind::Failed);
        assert!(!narrow.matches(&progress_a));
        assert!(!narrow.matches(&failed_b));
        assert_eq!(narrow.task_id(), Some("a"));
    }
}
