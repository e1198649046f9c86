//! # Monitor configuration.
//!
//! Provides [`MonitorConfig`], the settings fixed at monitor construction.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no admission queue is ever used)
//! - `retention = 0s` → no automatic cleanup sweep

use std::time::Duration;

use crate::tasks::{DEFAULT_LOG_CAPACITY, DEFAULT_LOG_RETAIN, LogBuffer};

/// Configuration for a [`TaskMonitor`](crate::TaskMonitor).
///
/// ## Field semantics
/// - `max_concurrent`: Running-task cap (`0` = unlimited); not adjustable at runtime
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `log_capacity` / `log_retain`: per-task log ring size and entries kept on overflow
/// - `retention`: terminal tasks older than this are swept automatically (`0s` = never)
/// - `sweep_interval`: how often the retention sweep runs
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Maximum number of tasks in `Running` at any instant.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = at most `n` tasks run; further starts are queued FIFO
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// Per-task log capacity.
    pub log_capacity: usize,

    /// Entries kept when a task log overflows.
    pub log_retain: usize,

    /// Automatic cleanup window for terminal tasks (`Duration::ZERO` = disabled).
    pub retention: Duration,

    /// Period of the automatic cleanup sweep (ignored when `retention` is zero).
    pub sweep_interval: Duration,
}

impl MonitorConfig {
    /// Returns the concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` running tasks
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the retention window as an `Option`.
    #[inline]
    pub fn retention_window(&self) -> Option<Duration> {
        if self.retention.is_zero() {
            None
        } else {
            Some(self.retention)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Sweep period clamped to at least one millisecond.
    #[inline]
    pub fn sweep_interval_clamped(&self) -> Duration {
        self.sweep_interval.max(Duration::from_millis(1))
    }

    /// Fresh, empty log buffer sized by this config.
    pub(crate) fn new_log(&self) -> LogBuffer {
        LogBuffer::new(self.log_capacity, self.log_retain)
    }
}

impl Default for MonitorConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent = 10`
    /// - `bus_capacity = 1024`
    /// - `log_capacity = 1000`, `log_retain = 500`
    /// - `retention = 0s` (no automatic sweep)
    /// - `sweep_interval = 60s`
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            bus_capacity: 1024,
            log_capacity: DEFAULT_LOG_CAPACITY,
            log_retain: DEFAULT_LOG_RETAIN,
            retention: Duration::ZERO,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.concurrency_limit(), Some(10));
        assert_eq!(cfg.retention_window(), None);
        assert_eq!(cfg.new_log().capacity(), 1000);
    }

    #[test]
    fn test_sentinels() {
        let cfg = MonitorConfig {
            max_concurrent: 0,
            bus_capacity: 0,
            retention: Duration::from_secs(5),
            sweep_interval: Duration::ZERO,
            ..MonitorConfig::default()
        };
        assert_eq!(cfg.concurrency_limit(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.retention_window(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.sweep_interval_clamped(), Duration::from_millis(1));
    }
}
