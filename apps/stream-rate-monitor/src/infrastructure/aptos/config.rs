//! Aptos adapter configuration.

use std::time::Duration;

/// Default testnet fullnode REST endpoint.
pub const DEFAULT_NODE_URL: &str = "https://fullnode.testnet.aptoslabs.com";

/// Configuration for the Aptos view client.
#[derive(Debug, Clone)]
pub struct AptosClientConfig {
    /// Fullnode REST base URL, without the `/v1` suffix.
    pub endpoint: String,
    /// Address the payment stream module is published under.
    pub module_address: String,
    /// Name of the payment stream module.
    pub module_name: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy configuration.
    pub retry: RetryConfig,
}

impl AptosClientConfig {
    /// Create a new configuration with default timeout and retry policy.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        module_address: impl Into<String>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            module_address: module_address.into(),
            module_name: module_name.into(),
            timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the view endpoint.
    #[must_use]
    pub fn view_url(&self) -> String {
        format!("{}/v1/view", self.endpoint.trim_end_matches('/'))
    }

    /// Fully qualified view function identifier for this module.
    #[must_use]
    pub fn view_function(&self, name: &str) -> String {
        format!("{}::{}::{}", self.module_address, self.module_name, name)
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per view call.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor applied to each backoff (0.2 = +/-20%).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}
