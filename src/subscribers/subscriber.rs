//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging custom event handlers
//! (display layers, loggers, metrics) into the monitor.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently of the monitor's callers)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged; monitor state is untouched)
//!
//! ## Architecture
//! ```text
//! SubscriberSet ──► filter ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                                └─► panic caught → tracing::warn!
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only**.
//! - Events are processed sequentially (FIFO) per subscriber, in `seq` order.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use taskmonitor::{Event, EventKind, Subscribe};
//!
//! struct Display;
//!
//! #[async_trait]
//! impl Subscribe for Display {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::Progress) {
//!             // redraw the progress bar for ev.task
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "display" }
//!     fn queue_capacity(&self) -> usize { 4096 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; panics are caught but the event is lost for this subscriber.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, not in the caller's context.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in diagnostics.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
