//! Monitor events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and task snapshot payload
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: `TaskMonitor`, while holding its registry lock.
//! - **Consumers**: any receiver obtained from `TaskMonitor::events()`. Subscriptions
//!   are fed by `SubscriberSet::emit` directly and never lag behind the bus.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
