//! Monitor core: registry, admission, progress and the public handle.
//!
//! The only entry points are [`TaskMonitor`] and [`MonitorBuilder`]; everything else
//! here is the machinery they drive.
//!
//! Internal modules:
//! - [`registry`]: lifecycle state machine, produces events and timer requests;
//! - [`admission`]: concurrency cap and FIFO queue of deferred starts;
//! - [`progress`]: step reports, derived task progress and completion estimate;
//! - [`stats`]: aggregate counts over the registry;
//! - [`monitor`]: lock discipline, effect application, timers;
//! - [`builder`]: bus, subscriber set and retention sweeper wiring.

mod admission;
mod builder;
mod config;
mod monitor;
mod progress;
mod registry;
mod stats;

pub use admission::Admission;
pub use builder::MonitorBuilder;
pub use config::MonitorConfig;
pub use monitor::TaskMonitor;
pub use progress::StepReport;
pub use stats::Stats;
