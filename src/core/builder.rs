//! # MonitorBuilder: wires bus, subscribers and background tasks.
//!
//! ```text
//! MonitorBuilder::new(cfg)
//!     .with_subscribers(vec![...])     (receive every event)
//!     .build()
//!         ├─ Bus::new(bus_capacity)                (raw events() receivers)
//!         ├─ SubscriberSet::new(Handle::current())  (one worker per subscription)
//!         └─ spawn sweeper:   every sweep_interval ─► cleanup(retention)   (retention > 0)
//! ```

use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::config::MonitorConfig;
use super::monitor::{Inner, TaskMonitor};
use super::registry::Registry;
use crate::events::Bus;
use crate::subscribers::{Filter, Subscribe, SubscriberSet};

/// Builder for constructing a [`TaskMonitor`] with initial subscribers.
pub struct MonitorBuilder {
    cfg: MonitorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl MonitorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: MonitorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets subscribers that receive every event (display layers, loggers, metrics).
    ///
    /// Each one gets a dedicated worker with a bounded queue.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the monitor and spawns its background tasks.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn build(self) -> TaskMonitor {
        let runtime = Handle::current();
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(runtime.clone()));
        let token = CancellationToken::new();

        for sub in self.subscribers {
            subs.subscribe(Filter::all(), sub);
        }

        let monitor = TaskMonitor {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::new(self.cfg.clone())),
                cfg: self.cfg,
                bus,
                subs,
                runtime,
                token,
            }),
        };
        spawn_sweeper(&monitor);
        monitor
    }
}

/// Periodic retention cleanup; a no-op when `retention` is zero.
fn spawn_sweeper(monitor: &TaskMonitor) {
    let inner = &monitor.inner;
    let Some(retention) = inner.cfg.retention_window() else {
        return;
    };
    let period = inner.cfg.sweep_interval_clamped();
    let token = inner.token.clone();
    let weak: Weak<Inner> = Arc::downgrade(inner);

    inner.runtime.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let removed = TaskMonitor { inner }.cleanup(retention);
            if removed > 0 {
                tracing::debug!(removed, ?retention, "retention sweep");
            }
        }
    });
}
