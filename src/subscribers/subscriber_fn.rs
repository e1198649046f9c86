//! # Closure-backed subscriber (`SubscriberFn`)
//!
//! [`SubscriberFn`] wraps a synchronous closure `F: Fn(&Event)` so small handlers
//! (callbacks from [`TaskOptions`](crate::TaskOptions), test recorders) need no trait impl.
//! Shared state goes in an `Arc<...>` captured by the closure.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use taskmonitor::{Event, Subscribe, SubscriberFn};
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! let sub = SubscriberFn::arc("counter", move |_ev: &Event| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//! assert_eq!(sub.name(), "counter");
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use super::Subscribe;
use crate::events::Event;

/// Function-backed subscriber.
pub struct SubscriberFn<F> {
    name: &'static str,
    f: F,
}

impl<F> SubscriberFn<F>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }

    /// Creates the subscriber and returns it as a shared handle.
    pub fn arc(name: &'static str, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F> Subscribe for SubscriberFn<F>
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    async fn on_event(&self, event: &Event) {
        (self.f)(event)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
