//! # Event subscribers for the task monitor.
//!
//! This module provides the [`Subscribe`] trait, subscription [`Filter`]s and the
//! [`SubscriberSet`] that fans events out to registered subscribers.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   TaskMonitor (registry lock held) ──► SubscriberSet::emit(&Event)
//!                                                   │ (filter per subscription)
//!                                         ┌─────────┼──────────┐
//!                                         ▼         ▼          ▼
//!                                     display   LogWriter   on_complete
//!                                                           callbacks
//! ```
//!
//! ## Subscriber types
//! - **Trait subscribers**: implement [`Subscribe`] (display layers, loggers, metrics).
//! - **Closure subscribers**: [`SubscriberFn`] (task option callbacks, one-off handlers).

#[cfg(feature = "logging")]
mod embedded;
mod filter;
mod set;
mod subscriber;
mod subscriber_fn;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use filter::Filter;
pub use set::{SubscriberSet, SubscriptionId};
pub use subscriber::Subscribe;
pub use subscriber_fn::SubscriberFn;
