//! # Task registry - lifecycle state machine.
//!
//! The registry owns every tracked [`Task`] and the [`AdmissionController`]. Each
//! operation validates, mutates, and records the resulting [`Effect`]s (events to
//! publish, timers to arm). The monitor drains those effects while still holding the
//! registry lock, so observers see changes in exactly the order they were applied.
//!
//! ## Architecture
//! ```text
//! TaskMonitor ──lock──► Registry::op(now)
//!                          ├─► validate (NotFound / InvalidState / IndexOutOfRange)
//!                          ├─► mutate task + steps, progress::recompute
//!                          ├─► finish() on terminal transitions
//!                          │      ├─ close running steps, stamp end_time, disarm timer
//!                          │      ├─ release slot / withdraw from queue
//!                          │      └─ promote(): start queue heads while slots are free
//!                          └─► effects: Publish(Event) | ArmTimer{..}
//! ```
//!
//! ## Rules
//! - Terminal statuses are final; every terminal transition goes through `finish()`.
//! - Step operations require the task to be `Running`.
//! - A step entering `Completed` is pinned to progress 100.
//! - No step is left `Running` once its task is terminal.
//! - The registry never spawns or sleeps; time is passed in as `now`.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::admission::{Admission, AdmissionController};
use super::config::MonitorConfig;
use super::progress::{self, StepReport};
use super::stats::Stats;
use crate::error::{MonitorError, TaskError};
use crate::events::{Event, EventKind};
use crate::subscribers::SubscriptionId;
use crate::tasks::{LogLevel, StepSpec, Task, TaskOptions, TaskStatus};

/// Side effects produced by registry operations.
pub(crate) enum Effect {
    /// Publish on the bus.
    Publish(Event),
    /// Start a timeout timer for a task that just entered `Running`.
    ArmTimer {
        task: String,
        epoch: u64,
        timeout: Duration,
        token: CancellationToken,
    },
}

/// Registry slot for one task.
struct Entry {
    task: Task,
    /// Unique per registration; guards timers against re-created ids.
    epoch: u64,
    /// Disarms the timeout timer.
    timer: Option<CancellationToken>,
    /// Task-bound subscriptions released on cleanup.
    subscriptions: Vec<SubscriptionId>,
}

pub(crate) struct Registry {
    entries: HashMap<String, Entry>,
    admission: AdmissionController,
    cfg: MonitorConfig,
    next_epoch: u64,
    effects: Vec<Effect>,
}

impl Registry {
    pub fn new(cfg: MonitorConfig) -> Self {
        Self {
            entries: HashMap::new(),
            admission: AdmissionController::new(cfg.concurrency_limit()),
            cfg,
            next_epoch: 1,
            effects: Vec::new(),
        }
    }

    /// Drains effects produced since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // ---------------------------
    // Creation and admission
    // ---------------------------

    pub fn create(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
        steps: Vec<StepSpec>,
        options: &TaskOptions,
        now: SystemTime,
    ) -> Result<Task, MonitorError> {
        if self.entries.contains_key(id) {
            return Err(MonitorError::DuplicateId { task: id.into() });
        }
        let mut task = Task::new(
            id.into(),
            name.into(),
            description.into(),
            steps,
            options,
            self.cfg.new_log(),
            now,
        )?;
        task.logs.record(
            now,
            LogLevel::Info,
            format!("created with {} steps", task.total_steps()),
        );

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.entries.insert(
            id.to_string(),
            Entry {
                task: task.clone(),
                epoch,
                timer: None,
                subscriptions: Vec::new(),
            },
        );
        self.publish(Event::new(EventKind::Created, task.clone(), now));
        Ok(task)
    }

    pub fn start(&mut self, id: &str, now: SystemTime) -> Result<Admission, MonitorError> {
        let status = self.entry(id)?.task.status;
        if status != TaskStatus::Pending || self.admission.is_queued(id) {
            return Err(invalid(id, status, "start"));
        }

        let admission = self.admission.admit(id);
        match admission {
            Admission::Started => self.begin_running(id, now),
            Admission::Queued { position } => {
                let entry = self.entry_mut(id)?;
                entry.task.logs.record(
                    now,
                    LogLevel::Info,
                    format!("queued at position {position}"),
                );
                let snapshot = entry.task.clone();
                self.publish(
                    Event::new(EventKind::Queued, snapshot, now).with_queue_position(position),
                );
            }
        }
        Ok(admission)
    }

    // ---------------------------
    // Step operations
    // ---------------------------

    pub fn report_step(
        &mut self,
        id: &str,
        index: usize,
        report: &StepReport,
        now: SystemTime,
    ) -> Result<Task, MonitorError> {
        let entry = self.entry_mut(id)?;
        let task = &mut entry.task;
        check_step(task, index, "report progress on")?;

        let step = &mut task.steps[index];
        let next = report.status();
        let allowed = match next {
            Some(next) => step.status.step_can_become(next),
            None => !step.status.is_terminal(),
        };
        if !allowed {
            return Err(invalid(id, step.status, "update step of"));
        }

        step.progress = report.progress();
        step.metadata
            .extend(report.metadata().iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut failure = None;
        if let Some(next) = next {
            if next != step.status {
                task.logs.record(
                    now,
                    LogLevel::Debug,
                    format!("step {index} '{}' {next}", step.name),
                );
            }
            match next {
                TaskStatus::Completed => step.progress = 100,
                TaskStatus::Failed => {
                    let err = TaskError::fail(format!("step '{}' failed", step.name));
                    step.error = Some(err.clone());
                    failure = Some(err);
                }
                _ => {}
            }
            step.set_status(next, now);
            if next == TaskStatus::Running {
                task.current_step_index = index;
            }
        }

        progress::recompute(task, now);
        let all_completed = task.all_steps_completed();
        let snapshot = task.clone();
        self.publish(Event::new(EventKind::Progress, snapshot, now));

        if let Some(err) = failure {
            self.finish(id, TaskStatus::Failed, Some(err), now);
        } else if all_completed {
            self.finish(id, TaskStatus::Completed, None, now);
        }
        self.snapshot(id)
    }

    pub fn complete_step(
        &mut self,
        id: &str,
        index: usize,
        result: Option<Value>,
        now: SystemTime,
    ) -> Result<Task, MonitorError> {
        let mut report = StepReport::new(100).with_status(TaskStatus::Completed);
        if let Some(result) = result {
            report = report.with_metadata("result", result);
        }
        self.report_step(id, index, &report, now)
    }

    pub fn fail_step(
        &mut self,
        id: &str,
        index: usize,
        error: TaskError,
        now: SystemTime,
    ) -> Result<Task, MonitorError> {
        let entry = self.entry_mut(id)?;
        let task = &mut entry.task;
        check_step(task, index, "fail step of")?;

        let step = &mut task.steps[index];
        if !step.status.step_can_become(TaskStatus::Failed) {
            return Err(invalid(id, step.status, "fail step of"));
        }
        step.error = Some(error.clone());
        step.set_status(TaskStatus::Failed, now);
        task.logs.record(
            now,
            LogLevel::Error,
            format!("step {index} '{}' failed: {error}", step.name),
        );

        self.finish(id, TaskStatus::Failed, Some(error), now);
        self.snapshot(id)
    }

    // ---------------------------
    // Task-level terminal operations
    // ---------------------------

    pub fn complete_task(
        &mut self,
        id: &str,
        result: Option<Value>,
        now: SystemTime,
    ) -> Result<Task, MonitorError> {
        let entry = self.entry_mut(id)?;
        let task = &mut entry.task;
        let blocked = task
            .steps
            .iter()
            .any(|s| s.status.is_terminal() && s.status != TaskStatus::Completed);
        if task.status != TaskStatus::Running || blocked {
            return Err(invalid(id, task.status, "complete"));
        }

        for step in task.steps.iter_mut() {
            if step.status != TaskStatus::Completed {
                step.progress = 100;
                step.set_status(TaskStatus::Completed, now);
            }
        }
        if let Some(result) = result {
            task.metadata.insert("result".into(), result);
        }
        progress::recompute(task, now);

        self.finish(id, TaskStatus::Completed, None, now);
        self.snapshot(id)
    }

    pub fn fail_task(
        &mut self,
        id: &str,
        error: TaskError,
        now: SystemTime,
    ) -> Result<Task, MonitorError> {
        let status = self.entry(id)?.task.status;
        if status.is_terminal() {
            return Err(invalid(id, status, "fail"));
        }
        self.finish(id, TaskStatus::Failed, Some(error), now);
        self.snapshot(id)
    }

    /// Cancels a non-terminal task. Returns `Ok(false)` for an already terminal task.
    pub fn cancel(
        &mut self,
        id: &str,
        reason: Option<TaskError>,
        now: SystemTime,
    ) -> Result<bool, MonitorError> {
        if self.entry(id)?.task.is_terminal() {
            return Ok(false);
        }
        self.finish(id, TaskStatus::Cancelled, reason, now);
        Ok(true)
    }

    /// Timer callback: cancels the task with a timeout cause if it is still the same
    /// registration and not yet terminal.
    pub fn expire(&mut self, id: &str, epoch: u64, timeout: Duration, now: SystemTime) -> bool {
        let live = self
            .entries
            .get(id)
            .is_some_and(|e| e.epoch == epoch && !e.task.is_terminal());
        if live {
            self.finish(id, TaskStatus::Cancelled, Some(TaskError::Timeout { timeout }), now);
        }
        live
    }

    // ---------------------------
    // Logs and metadata
    // ---------------------------

    pub fn log(
        &mut self,
        id: &str,
        level: LogLevel,
        message: String,
        now: SystemTime,
    ) -> Result<(), MonitorError> {
        let entry = self.entry_mut(id)?;
        entry.task.logs.record(now, level, message);
        let line = entry.task.logs.last().cloned();
        let snapshot = entry.task.clone();

        let mut ev = Event::new(EventKind::Log, snapshot, now);
        if let Some(line) = line {
            ev = ev.with_log(line);
        }
        self.publish(ev);
        Ok(())
    }

    pub fn set_metadata(&mut self, id: &str, key: String, value: Value) -> Result<Task, MonitorError> {
        let entry = self.entry_mut(id)?;
        entry.task.metadata.insert(key, value);
        Ok(entry.task.clone())
    }

    /// Binds a subscription to a task so cleanup releases it.
    pub fn attach_subscription(&mut self, id: &str, sub: SubscriptionId) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.subscriptions.push(sub);
                true
            }
            None => false,
        }
    }

    // ---------------------------
    // Queries
    // ---------------------------

    pub fn get(&self, id: &str) -> Option<Task> {
        self.entries.get(id).map(|e| e.task.clone())
    }

    /// All tasks in creation order.
    pub fn list(&self) -> Vec<Task> {
        self.sorted(|_| true)
    }

    /// `Pending` and `Running` tasks in creation order.
    pub fn active(&self) -> Vec<Task> {
        self.sorted(Task::is_active)
    }

    pub fn queued(&self) -> Vec<String> {
        self.admission.queued()
    }

    pub fn running_len(&self) -> usize {
        self.admission.running_len()
    }

    pub fn stats(&self) -> Stats {
        Stats::collect(
            self.entries.values().map(|e| &e.task),
            self.admission.queued().len(),
        )
    }

    /// Removes terminal tasks whose `end_time` is at least `older_than` ago.
    ///
    /// Returns the removed ids; a `Removed` event is published for each.
    pub fn cleanup(&mut self, older_than: Duration, now: SystemTime) -> Vec<String> {
        let mut expired: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|(_, e)| {
                e.task.is_terminal()
                    && e.task.end_time.is_some_and(|end| {
                        now.duration_since(end).unwrap_or_default() >= older_than
                    })
            })
            .map(|(id, e)| (e.epoch, id.clone()))
            .collect();
        expired.sort_unstable();

        let mut removed = Vec::with_capacity(expired.len());
        for (_, id) in expired {
            if let Some(entry) = self.entries.remove(&id) {
                self.publish(
                    Event::new(EventKind::Removed, entry.task, now)
                        .with_released(entry.subscriptions),
                );
                removed.push(id);
            }
        }
        removed
    }

    // ---------------------------
    // Helpers
    // ---------------------------

    fn entry(&self, id: &str) -> Result<&Entry, MonitorError> {
        self.entries
            .get(id)
            .ok_or_else(|| MonitorError::NotFound { task: id.into() })
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut Entry, MonitorError> {
        self.entries
            .get_mut(id)
            .ok_or_else(|| MonitorError::NotFound { task: id.into() })
    }

    fn snapshot(&self, id: &str) -> Result<Task, MonitorError> {
        self.entry(id).map(|e| e.task.clone())
    }

    fn sorted(&self, keep: impl Fn(&Task) -> bool) -> Vec<Task> {
        let mut entries: Vec<&Entry> = self.entries.values().filter(|e| keep(&e.task)).collect();
        entries.sort_unstable_by_key(|e| e.epoch);
        entries.into_iter().map(|e| e.task.clone()).collect()
    }

    fn publish(&mut self, ev: Event) {
        self.effects.push(Effect::Publish(ev));
    }

    /// Moves an admitted task to `Running` and arms its timer.
    fn begin_running(&mut self, id: &str, now: SystemTime) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.task.status = TaskStatus::Running;
        entry.task.start_time = Some(now);
        entry.task.logs.record(now, LogLevel::Info, "started");

        let timer = entry.task.timeout.map(|timeout| {
            let token = CancellationToken::new();
            entry.timer = Some(token.clone());
            Effect::ArmTimer {
                task: id.to_string(),
                epoch: entry.epoch,
                timeout,
                token,
            }
        });
        let snapshot = entry.task.clone();

        tracing::debug!(task = id, "task started");
        self.publish(Event::new(EventKind::Started, snapshot, now));
        if let Some(timer) = timer {
            self.effects.push(timer);
        }
    }

    /// Single path for every terminal transition.
    fn finish(
        &mut self,
        id: &str,
        status: TaskStatus,
        error: Option<TaskError>,
        now: SystemTime,
    ) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        let task = &mut entry.task;

        for step in task
            .steps
            .iter_mut()
            .filter(|s| s.status == TaskStatus::Running)
        {
            if status == TaskStatus::Failed {
                step.error = error.clone();
            }
            step.set_status(status, now);
        }
        if status == TaskStatus::Completed {
            task.progress = 100;
        }
        task.status = status;
        // A backward wall-clock step must not end a task before it started.
        let end = task.start_time.map_or(now, |start| now.max(start));
        task.end_time.get_or_insert(end);
        task.error = error.clone();

        if let Some(timer) = entry.timer.take() {
            timer.cancel();
        }

        let (level, line) = match &error {
            Some(err) => (LogLevel::Warn, format!("{status}: {err}")),
            None => (LogLevel::Info, status.to_string()),
        };
        let level = if status == TaskStatus::Failed {
            LogLevel::Error
        } else {
            level
        };
        task.logs.record(now, level, line);
        let snapshot = task.clone();

        if self.admission.is_running(id) {
            self.admission.release(id);
        } else {
            self.admission.withdraw(id);
        }

        let kind = match status {
            TaskStatus::Completed => EventKind::Completed,
            TaskStatus::Failed => EventKind::Failed,
            _ => EventKind::Cancelled,
        };
        tracing::debug!(task = id, %status, error = ?error, "task finished");
        let mut ev = Event::new(kind, snapshot, now);
        if let Some(err) = error {
            ev = ev.with_error(err);
        }
        self.publish(ev);

        self.promote(now);
    }

    /// Starts queue heads while slots are free.
    fn promote(&mut self, now: SystemTime) {
        while let Some(next) = self.admission.next() {
            let startable = self
                .entries
                .get(&next)
                .is_some_and(|e| e.task.status == TaskStatus::Pending);
            if startable {
                tracing::debug!(task = %next, "promoted from queue");
                self.begin_running(&next, now);
            } else {
                self.admission.release(&next);
            }
        }
    }
}

fn invalid(id: &str, status: TaskStatus, op: &'static str) -> MonitorError {
    MonitorError::InvalidState {
        task: id.into(),
        status,
        op,
    }
}

/// Validates that step operations are allowed on `task` at `index`.
fn check_step(task: &Task, index: usize, op: &'static str) -> Result<(), MonitorError> {
    if index >= task.total_steps() {
        return Err(MonitorError::IndexOutOfRange {
            task: task.id.clone(),
            index,
            total: task.total_steps(),
        });
    }
    if task.status != TaskStatus::Running {
        return Err(invalid(&task.id, task.status, op));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000)
    }

    fn at(ms: u64) -> SystemTime {
        t0() + Duration::from_millis(ms)
    }

    fn steps(n: usize) -> Vec<StepSpec> {
        (0..n)
            .map(|i| StepSpec::new(format!("s{i}"), format!("step {i}")))
            .collect()
    }

    fn registry(limit: usize) -> Registry {
        Registry::new(MonitorConfig {
            max_concurrent: limit,
            ..MonitorConfig::default()
        })
    }

    fn create(reg: &mut Registry, id: &str, n: usize) {
        reg.create(id, id, "", steps(n), &TaskOptions::default(), t0())
            .expect("create");
    }

    fn kinds(reg: &mut Registry) -> Vec<(String, EventKind)> {
        reg.take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Publish(ev) => Some((ev.task_id.to_string(), ev.kind)),
                Effect::ArmTimer { .. } => None,
            })
            .collect()
    }

    fn assert_progress_invariant(task: &Task) {
        let expected = progress::average_progress(&task.steps);
        assert_eq!(task.progress, expected, "progress must be the rounded mean");
        assert!(task.progress <= 100);
        assert_eq!(
            task.status == TaskStatus::Completed,
            task.all_steps_completed(),
            "Completed iff every step completed"
        );
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 1);
        let err = reg
            .create("t1", "again", "", steps(1), &TaskOptions::default(), t0())
            .unwrap_err();
        assert_eq!(err, MonitorError::DuplicateId { task: "t1".into() });
    }

    #[test]
    fn test_start_unknown_and_non_pending() {
        let mut reg = registry(10);
        assert!(matches!(
            reg.start("nope", t0()),
            Err(MonitorError::NotFound { .. })
        ));

        create(&mut reg, "t1", 1);
        assert_eq!(reg.start("t1", t0()), Ok(Admission::Started));
        assert!(matches!(
            reg.start("t1", t0()),
            Err(MonitorError::InvalidState {
                status: TaskStatus::Running,
                ..
            })
        ));
    }

    #[test]
    fn test_eleventh_task_queued_then_promoted() {
        let mut reg = registry(10);
        for i in 0..11 {
            create(&mut reg, &format!("t{i}"), 1);
        }
        for i in 0..10 {
            assert_eq!(reg.start(&format!("t{i}"), t0()), Ok(Admission::Started));
        }
        assert_eq!(
            reg.start("t10", t0()),
            Ok(Admission::Queued { position: 0 })
        );
        assert_eq!(reg.get("t10").map(|t| t.status), Some(TaskStatus::Pending));
        assert_eq!(reg.running_len(), 10);

        // Queued tasks cannot be started twice.
        assert!(matches!(
            reg.start("t10", t0()),
            Err(MonitorError::InvalidState { .. })
        ));

        reg.take_effects();
        reg.complete_step("t3", 0, None, at(50)).expect("complete");
        assert_eq!(reg.get("t10").map(|t| t.status), Some(TaskStatus::Running));
        assert_eq!(reg.get("t10").and_then(|t| t.start_time), Some(at(50)));
        assert_eq!(reg.running_len(), 10);
        assert!(reg.queued().is_empty());

        assert_eq!(
            kinds(&mut reg),
            vec![
                ("t3".to_string(), EventKind::Progress),
                ("t3".to_string(), EventKind::Completed),
                ("t10".to_string(), EventKind::Started),
            ]
        );
    }

    #[test]
    fn test_running_never_exceeds_cap() {
        let mut reg = registry(3);
        for i in 0..8 {
            let id = format!("t{i}");
            create(&mut reg, &id, 2);
            reg.start(&id, t0()).expect("start");
            assert!(reg.stats().running <= 3);
        }
        for round in 0..8 {
            let running: Vec<String> = reg
                .active()
                .into_iter()
                .filter(|t| t.status == TaskStatus::Running)
                .map(|t| t.id)
                .collect();
            if let Some(id) = running.first() {
                if round % 2 == 0 {
                    reg.fail_step(id, 1, TaskError::fail("x"), at(round)).expect("fail");
                } else {
                    reg.cancel(id, None, at(round)).expect("cancel");
                }
            }
            let stats = reg.stats();
            assert!(stats.running <= 3, "round {round}: {stats}");
        }
        assert_eq!(reg.stats().pending, 0);
    }

    #[test]
    fn test_step_index_out_of_range() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 3);
        reg.start("t1", t0()).expect("start");
        let err = reg
            .report_step("t1", 5, &StepReport::new(50), at(10))
            .unwrap_err();
        assert_eq!(
            err,
            MonitorError::IndexOutOfRange {
                task: "t1".into(),
                index: 5,
                total: 3
            }
        );
    }

    #[test]
    fn test_step_ops_require_running_task() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 2);
        assert!(matches!(
            reg.report_step("t1", 0, &StepReport::new(10), t0()),
            Err(MonitorError::InvalidState {
                status: TaskStatus::Pending,
                ..
            })
        ));
    }

    #[test]
    fn test_progress_and_eta() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 4);
        reg.start("t1", t0()).expect("start");

        let task = reg
            .report_step(
                "t1",
                0,
                &StepReport::new(100).with_status(TaskStatus::Running),
                at(1000),
            )
            .expect("report");
        assert_eq!(task.progress, 25);
        assert_eq!(task.steps[0].start_time, Some(at(1000)));
        assert_eq!(task.estimated_end_time, Some(at(4000)));
        assert_progress_invariant(&task);

        let task = reg
            .report_step("t1", 1, &StepReport::new(-20), at(1500))
            .expect("report");
        assert_eq!(task.steps[1].progress, 0);
        assert_progress_invariant(&task);
    }

    #[test]
    fn test_complete_all_steps_completes_task() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 3);
        reg.start("t1", t0()).expect("start");
        reg.take_effects();

        let mut last = 0;
        for i in 0..3 {
            reg.report_step(
                "t1",
                i,
                &StepReport::new(50).with_status(TaskStatus::Running),
                at(i as u64 * 10),
            )
            .expect("running");
            let task = reg
                .complete_step("t1", i, Some(serde_json::json!(i)), at(i as u64 * 10 + 5))
                .expect("complete");
            assert!(task.progress >= last);
            last = task.progress;
            assert_progress_invariant(&task);
            assert_eq!(task.steps[i].metadata.get("result"), Some(&serde_json::json!(i)));
        }

        let task = reg.get("t1").expect("task");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.end_time, Some(at(25)));

        let events = kinds(&mut reg);
        assert_eq!(events.last().map(|e| e.1), Some(EventKind::Completed));
        assert_eq!(
            events
                .iter()
                .filter(|e| e.1 == EventKind::Completed)
                .count(),
            1
        );
    }

    #[test]
    fn test_completed_step_with_partial_progress_is_pinned() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 2);
        reg.start("t1", t0()).expect("start");
        let task = reg
            .report_step(
                "t1",
                0,
                &StepReport::new(30).with_status(TaskStatus::Completed),
                at(1),
            )
            .expect("report");
        assert_eq!(task.steps[0].progress, 100);
        assert_eq!(task.progress, 50);
    }

    #[test]
    fn test_step_pointer_has_no_backward_guard() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 3);
        reg.start("t1", t0()).expect("start");
        let running = StepReport::new(10).with_status(TaskStatus::Running);

        let task = reg.report_step("t1", 2, &running, at(1)).expect("report");
        assert_eq!(task.current_step_index, 2);
        let task = reg.report_step("t1", 0, &running, at(2)).expect("report");
        assert_eq!(
            task.current_step_index, 0,
            "pointer follows the last step reported Running"
        );

        let task = reg
            .report_step("t1", 1, &StepReport::new(20), at(3))
            .expect("report");
        assert_eq!(task.current_step_index, 0, "progress-only reports do not move it");
    }

    #[test]
    fn test_fail_step_fails_task_immediately() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 3);
        reg.start("t1", t0()).expect("start");
        reg.report_step(
            "t1",
            0,
            &StepReport::new(40).with_status(TaskStatus::Running),
            at(1),
        )
        .expect("report");
        reg.take_effects();

        let task = reg
            .fail_step("t1", 1, TaskError::fail("disk full"), at(2))
            .expect("fail");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error, Some(TaskError::fail("disk full")));
        assert_eq!(task.end_time, Some(at(2)));
        assert_eq!(task.steps[1].status, TaskStatus::Failed);
        assert_eq!(task.steps[0].status, TaskStatus::Failed, "running step closed");
        assert_eq!(task.steps[2].status, TaskStatus::Pending);
        assert_progress_invariant(&task);
        assert_eq!(
            kinds(&mut reg),
            vec![("t1".to_string(), EventKind::Failed)]
        );
    }

    #[test]
    fn test_backward_clock_step_never_ends_before_start() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 2);
        reg.start("t1", at(100)).expect("start");
        reg.report_step(
            "t1",
            0,
            &StepReport::new(10).with_status(TaskStatus::Running),
            at(120),
        )
        .expect("report");

        // Wall clock stepped back behind both start times.
        let task = reg
            .fail_task("t1", TaskError::fail("lost"), at(50))
            .expect("fail");
        assert_eq!(task.start_time, Some(at(100)));
        assert_eq!(task.end_time, Some(at(100)));
        assert_eq!(task.execution_time(), Some(Duration::ZERO));
        assert_eq!(task.steps[0].start_time, Some(at(120)));
        assert_eq!(task.steps[0].end_time, Some(at(120)));
        assert!(task.steps[1].end_time.is_none());
    }

    #[test]
    fn test_cancel_closes_running_steps_and_is_idempotent() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 2);
        reg.start("t1", t0()).expect("start");
        reg.report_step(
            "t1",
            0,
            &StepReport::new(10).with_status(TaskStatus::Running),
            at(1),
        )
        .expect("report");

        assert_eq!(
            reg.cancel("t1", Some(TaskError::canceled("user")), at(5)),
            Ok(true)
        );
        let task = reg.get("t1").expect("task");
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert_eq!(task.steps[0].status, TaskStatus::Cancelled);
        assert_eq!(task.steps[0].end_time, Some(at(5)));
        assert_eq!(task.steps[1].status, TaskStatus::Pending);
        assert_eq!(task.error, Some(TaskError::canceled("user")));

        reg.take_effects();
        assert_eq!(reg.cancel("t1", None, at(9)), Ok(false));
        assert!(kinds(&mut reg).is_empty(), "second cancel publishes nothing");
        assert_eq!(reg.get("t1").and_then(|t| t.end_time), Some(at(5)));
        assert!(matches!(
            reg.cancel("ghost", None, at(9)),
            Err(MonitorError::NotFound { .. })
        ));
    }

    #[test]
    fn test_cancel_queued_task_withdraws_it() {
        let mut reg = registry(1);
        create(&mut reg, "a", 1);
        create(&mut reg, "b", 1);
        create(&mut reg, "c", 1);
        reg.start("a", t0()).expect("start");
        reg.start("b", t0()).expect("start");
        reg.start("c", t0()).expect("start");

        assert_eq!(reg.cancel("b", None, at(1)), Ok(true));
        assert_eq!(reg.queued(), vec!["c".to_string()]);

        reg.complete_task("a", None, at(2)).expect("complete");
        assert_eq!(reg.get("c").map(|t| t.status), Some(TaskStatus::Running));
        assert_eq!(reg.get("b").and_then(|t| t.start_time), None);
    }

    #[test]
    fn test_timer_is_armed_and_guarded_by_epoch() {
        let mut reg = registry(10);
        let opts = TaskOptions::new().with_timeout(Duration::from_millis(100));
        reg.create("t1", "t1", "", steps(1), &opts, t0()).expect("create");
        reg.start("t1", t0()).expect("start");

        let (epoch, token) = reg
            .take_effects()
            .into_iter()
            .find_map(|e| match e {
                Effect::ArmTimer {
                    epoch,
                    token,
                    timeout,
                    ..
                } => {
                    assert_eq!(timeout, Duration::from_millis(100));
                    Some((epoch, token))
                }
                Effect::Publish(_) => None,
            })
            .expect("timer armed");

        assert!(!reg.expire("t1", epoch + 1, Duration::from_millis(100), at(100)));
        assert!(reg.expire("t1", epoch, Duration::from_millis(100), at(100)));
        assert!(token.is_cancelled(), "terminal transition disarms the timer");

        let task = reg.get("t1").expect("task");
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(task.error.as_ref().is_some_and(TaskError::is_timeout));
        assert!(!reg.expire("t1", epoch, Duration::from_millis(100), at(200)));
    }

    #[test]
    fn test_complete_task_marks_remaining_steps() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 3);
        reg.start("t1", t0()).expect("start");
        let task = reg
            .complete_task("t1", Some(serde_json::json!("ok")), at(10))
            .expect("complete");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(task.metadata.get("result"), Some(&serde_json::json!("ok")));
        assert_progress_invariant(&task);

        assert!(matches!(
            reg.complete_task("t1", None, at(11)),
            Err(MonitorError::InvalidState { .. })
        ));
        assert!(matches!(
            reg.fail_task("t1", TaskError::fail("late"), at(11)),
            Err(MonitorError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_complete_task_rejected_with_cancelled_step() {
        let mut reg = registry(10);
        create(&mut reg, "t1", 2);
        reg.start("t1", t0()).expect("start");
        reg.report_step(
            "t1",
            0,
            &StepReport::new(0).with_status(TaskStatus::Cancelled),
            at(1),
        )
        .expect("step cancel does not cascade");
        assert_eq!(reg.get("t1").map(|t| t.status), Some(TaskStatus::Running));
        assert!(matches!(
            reg.complete_task("t1", None, at(2)),
            Err(MonitorError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_cleanup_keeps_active_tasks() {
        let mut reg = registry(1);
        for id in ["done", "failed", "running", "pending"] {
            create(&mut reg, id, 1);
        }
        reg.start("done", t0()).expect("start");
        reg.complete_task("done", None, at(1)).expect("complete");
        reg.fail_task("failed", TaskError::fail("x"), at(2))
            .expect("fail pending");
        reg.start("running", at(3)).expect("start");
        reg.start("pending", at(3)).expect("queued");
        let sub_id = SubscriptionId(7);
        assert!(reg.attach_subscription("done", sub_id));
        reg.take_effects();

        assert!(reg.cleanup(Duration::from_secs(60), at(4)).is_empty());
        let removed = reg.cleanup(Duration::ZERO, at(4));
        assert_eq!(removed, vec!["done".to_string(), "failed".to_string()]);

        let ids: Vec<String> = reg.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["running".to_string(), "pending".to_string()]);

        let released: Vec<Vec<SubscriptionId>> = reg
            .take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Publish(ev) if ev.kind == EventKind::Removed => Some(ev.released),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec![vec![sub_id], vec![]]);
    }

    #[test]
    fn test_stats() {
        let mut reg = registry(10);
        for id in ["a", "b", "c", "d"] {
            create(&mut reg, id, 1);
        }
        reg.start("a", at(0)).expect("start");
        reg.complete_task("a", None, at(100)).expect("complete");
        reg.start("b", at(0)).expect("start");
        reg.complete_task("b", None, at(300)).expect("complete");
        reg.start("c", at(0)).expect("start");
        reg.cancel("c", None, at(10)).expect("cancel");

        let stats = reg.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.running, 0);
        assert_eq!(stats.average_execution_time, Duration::from_millis(200));

        assert_eq!(registry(1).stats().average_execution_time, Duration::ZERO);
    }

    #[test]
    fn test_log_ring_is_bounded() {
        let mut reg = Registry::new(MonitorConfig {
            max_concurrent: 0,
            log_capacity: 10,
            log_retain: 5,
            ..MonitorConfig::default()
        });
        create(&mut reg, "t1", 1);
        for i in 0..25 {
            reg.log("t1", LogLevel::Info, format!("line {i}"), at(i)).expect("log");
        }
        let task = reg.get("t1").expect("task");
        assert!(task.logs.len() <= 10);
        assert_eq!(task.logs.last().map(|e| e.message.as_str()), Some("line 24"));
    }
}
