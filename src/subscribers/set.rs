//! # SubscriberSet: filtered, non-blocking fan-out
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscription whose
//! [`Filter`] matches, **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order equals emit order).
//! - Panics inside subscribers are caught and logged (isolation).
//! - Subscriptions can be added and removed at runtime.
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for that
//!   subscriber).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        │                 (filter match, Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├──────── x        (filtered out)
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};

use super::{Filter, Subscribe};
use crate::events::Event;

/// Handle returned by [`SubscriberSet::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Per-subscriber channel with metadata.
struct SubscriberChannel {
    id: SubscriptionId,
    name: &'static str,
    filter: Filter,
    sender: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: RwLock<Vec<SubscriberChannel>>,
    next_id: AtomicU64,
    runtime: Handle,
}

impl SubscriberSet {
    /// Creates an empty set whose workers run on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            runtime,
        }
    }

    /// Registers a subscriber and spawns its worker.
    pub fn subscribe(&self, filter: Filter, sub: Arc<dyn Subscribe>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cap = sub.queue_capacity().max(1);
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);

        let worker = self.runtime.spawn(async move {
            while let Some(ev) = rx.recv().await {
                let fut = sub.on_event(ev.as_ref());
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    let any = &*panic_err;
                    let info = if let Some(msg) = any.downcast_ref::<&'static str>() {
                        (*msg).to_string()
                    } else if let Some(msg) = any.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "unknown panic".to_string()
                    };
                    tracing::warn!(
                        subscriber = sub.name(),
                        seq = ev.seq,
                        kind = %ev.kind,
                        panic = %info,
                        "subscriber panicked"
                    );
                }
            }
        });

        self.write().push(SubscriberChannel {
            id,
            name,
            filter,
            sender: tx,
            worker,
        });
        tracing::debug!(subscriber = name, %id, "subscriber registered");
        id
    }

    /// Removes a subscription. Already queued events are still delivered.
    ///
    /// Returns `false` if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut channels = self.write();
        let before = channels.len();
        channels.retain(|c| c.id != id);
        before != channels.len()
    }

    /// Fan-out one event to all matching subscribers (non-blocking).
    ///
    /// If a subscriber's queue is **full** or **closed**, the event is dropped for it
    /// and a warning is logged with the subscriber's name.
    pub fn emit(&self, event: &Event) {
        let channels = self.read();
        let ev = Arc::new(event.clone());
        for channel in channels.iter().filter(|c| c.filter.matches(event)) {
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        seq = event.seq,
                        "subscriber dropped event: queue full"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(
                        subscriber = channel.name,
                        seq = event.seq,
                        "subscriber dropped event: worker closed"
                    );
                }
            }
        }
    }

    /// Closes every queue; workers finish the events already queued and exit.
    pub fn close(&self) {
        self.write().clear();
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(&self) {
        let drained: Vec<SubscriberChannel> = self.write().drain(..).collect();
        let workers: Vec<JoinHandle<()>> = drained.into_iter().map(|c| c.worker).collect();
        for h in workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<SubscriberChannel>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<SubscriberChannel>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }
}
