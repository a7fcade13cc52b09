//! Configuration Module
//!
//! Configuration loading for the rate monitor service.

mod settings;

pub use settings::{ConfigError, MonitorSettings, ServerSettings};
