//! Application Services
//!
//! Long-running services that coordinate domain logic and ports.

mod rate_monitor;

pub use rate_monitor::{CycleOutcome, RateMonitorConfig, RateMonitorService, RateSnapshot};
