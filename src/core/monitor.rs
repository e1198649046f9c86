//! # TaskMonitor: the public handle over registry, admission, timers and events.
//!
//! The [`TaskMonitor`] serializes every state change through one registry mutex and
//! dispatches the resulting events **while that lock is held**, so delivery order is
//! exactly the mutation order. Events are handed to the [`SubscriberSet`] directly:
//! enqueueing is a non-blocking `try_send` into each matching subscriber's own queue, and
//! subscriber code runs on its worker, never under the lock. The broadcast [`Bus`] only
//! feeds raw [`TaskMonitor::events`] receivers.
//!
//! ## Key responsibilities
//! - validate and apply lifecycle operations (create, start, step reports, terminal ops)
//! - queue starts beyond `max_concurrent` and promote them FIFO as slots free up
//! - arm per-task timeout timers when a task enters `Running`
//! - register `TaskOptions` callbacks as task-filtered subscriptions
//! - release those subscriptions when cleanup evicts the task
//!
//! ## High-level architecture
//! ```text
//! caller ──► TaskMonitor::op()
//!              └─► lock(Registry) ─► Registry::op(now) ─► take_effects()
//!                                                          ├─ Publish(ev) ─► SubscriberSet::emit
//!                                                          │                 then Bus (raw)
//!                                                          └─ ArmTimer    ─► spawn timer
//!
//! timer:   select! { sleep(timeout) | disarm token | runtime token }
//!            └─► sleep won ─► lock(Registry) ─► expire(id, epoch) ─► Cancelled(Timeout)
//!
//! SubscriberSet::emit(&ev) ──► per-subscriber queue ──► worker ──► on_event()
//!   └─► Removed: unsubscribe(ev.released) after fan-out
//! ```
//!
//! ## Example
//! ```rust
//! use taskmonitor::{MonitorConfig, StepSpec, TaskMonitor, TaskOptions, TaskStatus};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), taskmonitor::MonitorError> {
//!     let monitor = TaskMonitor::new(MonitorConfig::default());
//!
//!     monitor.create_task(
//!         "build",
//!         "Build release",
//!         "",
//!         vec![StepSpec::new("fetch", "Fetch"), StepSpec::new("compile", "Compile")],
//!         TaskOptions::new(),
//!     )?;
//!     monitor.start_task("build")?;
//!     monitor.complete_step("build", 0, None)?;
//!     let task = monitor.complete_step("build", 1, None)?;
//!
//!     assert_eq!(task.status, TaskStatus::Completed);
//!     assert_eq!(task.progress, 100);
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::admission::Admission;
use super::builder::MonitorBuilder;
use super::config::MonitorConfig;
use super::progress::StepReport;
use super::registry::{Effect, Registry};
use super::stats::Stats;
use crate::error::{MonitorError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Filter, Subscribe, SubscriberFn, SubscriberSet, SubscriptionId};
use crate::tasks::{LogLevel, StepSpec, Task, TaskOptions};

/// Cloneable handle to a task monitor.
///
/// All clones share one registry. Background work (timers, retention sweep) stops when the last clone is dropped or [`TaskMonitor::shutdown`] is called.
#[derive(Clone)]
pub struct TaskMonitor {
    pub(super) inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) cfg: MonitorConfig,
    pub(super) registry: Mutex<Registry>,
    pub(super) bus: Bus,
    pub(super) subs: Arc<SubscriberSet>,
    pub(super) runtime: Handle,
    pub(super) token: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl TaskMonitor {
    /// Creates a monitor with no initial subscribers.
    ///
    /// # Panics
    /// Must be called from within a tokio runtime (see [`MonitorBuilder::build`]).
    pub fn new(cfg: MonitorConfig) -> Self {
        MonitorBuilder::new(cfg).build()
    }

    /// Returns a builder for configuring initial subscribers.
    pub fn builder(cfg: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder::new(cfg)
    }

    /// The configuration this monitor was built with.
    pub fn config(&self) -> &MonitorConfig {
        &self.inner.cfg
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Registers a new `Pending` task.
    ///
    /// Callbacks in `options` become subscriptions filtered on this task and are
    /// released when the task is evicted by cleanup.
    ///
    /// # Errors
    /// - [`MonitorError::DuplicateId`] if `id` is already tracked
    /// - [`MonitorError::EmptySteps`] if `steps` is empty
    pub fn create_task(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        steps: Vec<StepSpec>,
        options: TaskOptions,
    ) -> Result<Task, MonitorError> {
        let id = id.into();
        let (name, description) = (name.into(), description.into());
        self.with_registry(|reg, now| {
            let task = reg.create(&id, &name, &description, steps, &options, now)?;
            for sub in self.callback_subscriptions(&id, &options) {
                reg.attach_subscription(&id, sub);
            }
            Ok(task)
        })
    }

    /// Moves a `Pending` task to `Running`, or queues it when the cap is reached.
    ///
    /// # Errors
    /// - [`MonitorError::NotFound`] for an unknown id
    /// - [`MonitorError::InvalidState`] if the task is not `Pending` or already queued
    pub fn start_task(&self, id: &str) -> Result<Admission, MonitorError> {
        self.with_registry(|reg, now| reg.start(id, now))
    }

    /// Applies a progress report to one step and returns the updated task.
    ///
    /// Completing the last step completes the task; a report with status `Failed`
    /// fails it.
    pub fn report_step_progress(
        &self,
        id: &str,
        index: usize,
        report: StepReport,
    ) -> Result<Task, MonitorError> {
        self.with_registry(|reg, now| reg.report_step(id, index, &report, now))
    }

    /// Marks a step `Completed` at 100%, storing `result` under the step's `"result"` key.
    pub fn complete_step(
        &self,
        id: &str,
        index: usize,
        result: Option<Value>,
    ) -> Result<Task, MonitorError> {
        self.with_registry(|reg, now| reg.complete_step(id, index, result, now))
    }

    /// Fails a step and, with it, the whole task.
    pub fn fail_step(
        &self,
        id: &str,
        index: usize,
        error: impl Into<String>,
    ) -> Result<Task, MonitorError> {
        let error = TaskError::fail(error);
        self.with_registry(|reg, now| reg.fail_step(id, index, error, now))
    }

    /// Completes a running task, marking every unfinished step `Completed`.
    pub fn complete_task(&self, id: &str, result: Option<Value>) -> Result<Task, MonitorError> {
        self.with_registry(|reg, now| reg.complete_task(id, result, now))
    }

    /// Fails a non-terminal task.
    pub fn fail_task(&self, id: &str, error: impl Into<String>) -> Result<Task, MonitorError> {
        let error = TaskError::fail(error);
        self.with_registry(|reg, now| reg.fail_task(id, error, now))
    }

    /// Cancels a non-terminal task.
    ///
    /// Returns `Ok(false)` without any change if the task is already terminal.
    pub fn cancel_task(&self, id: &str, reason: Option<&str>) -> Result<bool, MonitorError> {
        let reason = reason.map(TaskError::canceled);
        self.with_registry(|reg, now| reg.cancel(id, reason, now))
    }

    /// Appends a line to the task log and publishes a `Log` event.
    pub fn log(
        &self,
        id: &str,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<(), MonitorError> {
        let message = message.into();
        self.with_registry(|reg, now| reg.log(id, level, message, now))
    }

    /// Sets one task metadata entry.
    pub fn set_metadata(
        &self,
        id: &str,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<Task, MonitorError> {
        let (key, value) = (key.into(), value.into());
        self.with_registry(|reg, _| reg.set_metadata(id, key, value))
    }

    // ---------------------------
    // Queries
    // ---------------------------

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.lock().get(id)
    }

    /// Every tracked task, in creation order.
    pub fn list_tasks(&self) -> Vec<Task> {
        self.lock().list()
    }

    /// `Pending` and `Running` tasks, in creation order.
    pub fn list_active_tasks(&self) -> Vec<Task> {
        self.lock().active()
    }

    /// Ids waiting for a slot, head first.
    pub fn queued(&self) -> Vec<String> {
        self.lock().queued()
    }

    pub fn running_count(&self) -> usize {
        self.lock().running_len()
    }

    pub fn stats(&self) -> Stats {
        self.lock().stats()
    }

    /// Removes terminal tasks that ended at least `older_than` ago.
    ///
    /// Returns how many tasks were removed. Subscriptions bound to a removed task are
    /// released once its `Removed` event has been delivered.
    pub fn cleanup(&self, older_than: Duration) -> usize {
        self.with_registry(|reg, now| reg.cleanup(older_than, now).len())
    }

    // ---------------------------
    // Subscriptions
    // ---------------------------

    /// Registers a subscriber for events matching `filter`.
    ///
    /// The subscription sees exactly the events of operations that happen after this
    /// call returns; nothing published earlier is replayed to it.
    ///
    /// A subscription filtered on an existing task is bound to it and released when
    /// cleanup evicts that task.
    pub fn subscribe(&self, filter: Filter, sub: Arc<dyn Subscribe>) -> SubscriptionId {
        let mut reg = self.lock();
        let task = filter.task_id().map(str::to_owned);
        let id = self.inner.subs.subscribe(filter, sub);
        if let Some(task) = task {
            reg.attach_subscription(&task, id);
        }
        id
    }

    /// Registers a closure subscriber.
    pub fn subscribe_fn<F>(&self, filter: Filter, name: &'static str, f: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(filter, SubscriberFn::arc(name, f))
    }

    /// Removes a subscription. Returns `false` for an unknown id.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subs.unsubscribe(id)
    }

    /// Raw receiver over every subsequent event, bypassing filters and worker queues.
    ///
    /// The receiver reads a broadcast ring of `bus_capacity` events. A receiver that
    /// falls further behind gets `RecvError::Lagged` and loses the oldest events;
    /// subscriptions are not affected by that.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    /// Stops background work: timers and the retention sweep.
    ///
    /// Subscriber queues are closed; events already queued are still delivered. The
    /// registry stays readable and writable, but no further events reach subscribers.
    pub fn shutdown(&self) {
        self.inner.token.cancel();
        self.inner.subs.close();
        tracing::debug!("monitor shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    // ---------------------------
    // Internals
    // ---------------------------

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `op` under the registry lock, then applies its effects before unlocking.
    fn with_registry<R>(&self, op: impl FnOnce(&mut Registry, SystemTime) -> R) -> R {
        let mut reg = self.lock();
        let out = op(&mut reg, SystemTime::now());
        for effect in reg.take_effects() {
            match effect {
                Effect::Publish(ev) => self.dispatch(ev),
                Effect::ArmTimer {
                    task,
                    epoch,
                    timeout,
                    token,
                } => self.arm_timer(task, epoch, timeout, token),
            }
        }
        out
    }

    /// Fans `ev` out to subscriptions, releases the ones bound to an evicted task, then
    /// hands it to raw bus receivers.
    fn dispatch(&self, ev: Event) {
        let subs = &self.inner.subs;
        subs.emit(&ev);
        for id in &ev.released {
            subs.unsubscribe(*id);
        }
        self.inner.bus.publish(ev);
    }

    fn arm_timer(&self, task: String, epoch: u64, timeout: Duration, disarm: CancellationToken) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let runtime_token = self.inner.token.clone();

        self.inner.runtime.spawn(async move {
            tokio::select! {
                _ = disarm.cancelled() => {}
                _ = runtime_token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(inner) = weak.upgrade() {
                        let monitor = TaskMonitor { inner };
                        let fired = monitor
                            .with_registry(|reg, now| reg.expire(&task, epoch, timeout, now));
                        if fired {
                            tracing::debug!(task = %task, ?timeout, "task timed out");
                        }
                    }
                }
            }
        });
    }

    /// Subscribes the option callbacks of a new task.
    fn callback_subscriptions(&self, id: &str, options: &TaskOptions) -> Vec<SubscriptionId> {
        let subs = &self.inner.subs;
        let mut ids = Vec::new();

        if let Some(cb) = options.on_progress.clone() {
            let filter = Filter::task(id).with_kind(EventKind::Progress);
            ids.push(subs.subscribe(
                filter,
                SubscriberFn::arc("on_progress", move |ev: &Event| cb(ev.task.as_ref())),
            ));
        }
        if let Some(cb) = options.on_complete.clone() {
            let filter = Filter::task(id).with_kind(EventKind::Completed);
            ids.push(subs.subscribe(
                filter,
                SubscriberFn::arc("on_complete", move |ev: &Event| cb(ev.task.as_ref())),
            ));
        }
        if let Some(cb) = options.on_error.clone() {
            let filter = Filter::task(id).with_kind(EventKind::Failed);
            ids.push(subs.subscribe(
                filter,
                SubscriberFn::arc("on_error", move |ev: &Event| {
                    if let Some(err) = &ev.error {
                        cb(ev.task.as_ref(), err);
                    }
                }),
            ));
        }
        ids
    }
}
