//! # Event bus for broadcasting monitor events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. The monitor publishes
//! while holding its registry lock, so the channel order is exactly the order in which
//! state changes were applied. Subscriptions do not read from the bus; it only feeds
//! raw receivers.
//!
//! ## Architecture
//! ```text
//! TaskMonitor (under registry lock) ──► SubscriberSet::emit   (per-subscription queues)
//!                                   └─► Bus ──► events() receivers (raw consumers)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for monitor events.
///
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
