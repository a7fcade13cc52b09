//! Monitor Configuration Settings
//!
//! Configuration types for the rate monitor, loaded from environment variables.

use std::time::Duration;

use crate::application::services::RateMonitorConfig;
use crate::domain::stream::AccountAddress;
use crate::infrastructure::aptos::{AptosClientConfig, DEFAULT_NODE_URL, RetryConfig};

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Port for the rate and health endpoints.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 8091 }
    }
}

/// Complete monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Fullnode REST endpoint.
    pub node_url: String,
    /// Address that published the payment stream module.
    pub module_address: String,
    /// Name of the payment stream module.
    pub module_name: String,
    /// Per-request HTTP timeout for view calls.
    pub http_timeout: Duration,
    /// Total view call attempts before giving up.
    pub retry_max_attempts: u32,
    /// Account watched at startup, if any.
    pub watched_account: Option<AccountAddress>,
    /// Delay between refresh cycles, in milliseconds.
    pub poll_interval_ms: u64,
    /// HTTP server settings.
    pub server: ServerSettings,
}

impl MonitorSettings {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        let module_address = std::env::var("MODULE_ADDRESS")
            .map_err(|_| ConfigError::MissingEnvVar("MODULE_ADDRESS".to_string()))?;

        let module_name = std::env::var("MODULE_NAME")
            .map_err(|_| ConfigError::MissingEnvVar("MODULE_NAME".to_string()))?;

        if module_address.is_empty() {
            return Err(ConfigError::EmptyValue("MODULE_ADDRESS".to_string()));
        }

        if module_name.is_empty() {
            return Err(ConfigError::EmptyValue("MODULE_NAME".to_string()));
        }

        let node_url = std::env::var("APTOS_NODE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_NODE_URL.to_string());

        let watched_account = std::env::var("RATE_MONITOR_ACCOUNT")
            .ok()
            .filter(|v| !v.is_empty())
            .map(AccountAddress::new);

        let server = ServerSettings {
            http_port: parse_env_u16(
                "RATE_MONITOR_HTTP_PORT",
                ServerSettings::default().http_port,
            ),
        };

        Ok(Self {
            node_url,
            module_address,
            module_name,
            http_timeout: parse_env_duration_secs(
                "RATE_MONITOR_HTTP_TIMEOUT_SECS",
                Duration::from_secs(10),
            ),
            retry_max_attempts: parse_env_u32(
                "RATE_MONITOR_RETRY_MAX_ATTEMPTS",
                RetryConfig::default().max_attempts,
            ),
            watched_account,
            poll_interval_ms: parse_env_u64(
                "RATE_MONITOR_POLL_INTERVAL_MS",
                RateMonitorConfig::default().poll_interval_ms,
            ),
            server,
        })
    }

    /// Build the fullnode client config from these settings.
    #[must_use]
    pub fn aptos_config(&self) -> AptosClientConfig {
        AptosClientConfig::new(
            self.node_url.clone(),
            self.module_address.clone(),
            self.module_name.clone(),
        )
        .with_timeout(self.http_timeout)
        .with_retry(RetryConfig {
            max_attempts: self.retry_max_attempts,
            ..RetryConfig::default()
        })
    }

    /// Build the monitor service config from these settings.
    #[must_use]
    pub const fn monitor_config(&self) -> RateMonitorConfig {
        RateMonitorConfig {
            poll_interval_ms: self.poll_interval_ms,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}
