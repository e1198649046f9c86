//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders events as leveled `tracing` lines (demo/debug).

mod log;

pub use log::LogWriter;
