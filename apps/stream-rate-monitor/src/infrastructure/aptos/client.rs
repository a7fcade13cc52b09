//! Fullnode view client with retry logic.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::config::{AptosClientConfig, RetryConfig};
use super::error::AptosClientError;
use super::view::{
    QueryDirection, RECEIVER_STREAMS_FUNCTION, SENDER_STREAMS_FUNCTION, ViewRequest,
    decode_stream_columns,
};
use crate::application::ports::{LedgerQueryError, LedgerQueryPort};
use crate::domain::stream::{AccountAddress, StreamRecord};
use crate::infrastructure::metrics as monitor_metrics;

/// HTTP client for the fullnode `/v1/view` endpoint with retry logic.
#[derive(Debug, Clone)]
pub struct AptosViewClient {
    client: Client,
    config: AptosClientConfig,
}

impl AptosViewClient {
    /// Create a new view client from config.
    pub fn new(config: AptosClientConfig) -> Result<Self, AptosClientError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AptosClientError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Call one stream view function for an account, retrying transient
    /// failures with jittered exponential backoff.
    pub async fn call_view(
        &self,
        function: &str,
        account: &AccountAddress,
    ) -> Result<Value, AptosClientError> {
        let url = self.config.view_url();
        let request = ViewRequest::for_account(self.config.view_function(function), account);
        let mut backoff = ExponentialBackoff::new(&self.config.retry);

        loop {
            let response = match self
                .client
                .post(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            function,
                            error = %e,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        monitor_metrics::record_view_retry(function);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AptosClientError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| AptosClientError::Network(e.to_string()))?;
                return serde_json::from_str(&text)
                    .map_err(|e| AptosClientError::JsonParse(e.to_string()));
            }

            // Handle error response
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();
            let error_message = match serde_json::from_str::<NodeErrorBody>(&error_body) {
                Ok(err) => err.message,
                Err(_) => error_body,
            };

            // Categorize and handle error
            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    // Retry-After overrides the computed delay but never the
                    // attempt budget.
                    let Some(computed) = backoff.next_backoff() else {
                        return Err(AptosClientError::MaxRetriesExceeded {
                            attempts: backoff.attempt,
                        });
                    };
                    let delay = retry_after.map_or(computed, Duration::from_secs);
                    tracing::warn!(
                        function,
                        delay_ms = delay.as_millis(),
                        attempt = backoff.attempt,
                        "Rate limited, retrying"
                    );
                    monitor_metrics::record_view_retry(function);
                    tokio::time::sleep(delay).await;
                }
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            function,
                            status = status.as_u16(),
                            message = %error_message,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Retryable error, retrying"
                        );
                        monitor_metrics::record_view_retry(function);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(AptosClientError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                    });
                }
                ErrorCategory::NonRetryable => {
                    return Err(AptosClientError::Api {
                        status: status.as_u16(),
                        message: error_message,
                    });
                }
            }
        }
    }
}

#[async_trait]
impl LedgerQueryPort for AptosViewClient {
    async fn sender_streams(
        &self,
        account: &AccountAddress,
    ) -> Result<Vec<StreamRecord>, LedgerQueryError> {
        let body = self.call_view(SENDER_STREAMS_FUNCTION, account).await?;
        decode_stream_columns(account, QueryDirection::Outgoing, &body).map_err(Into::into)
    }

    async fn receiver_streams(
        &self,
        account: &AccountAddress,
    ) -> Result<Vec<StreamRecord>, LedgerQueryError> {
        let body = self.call_view(RECEIVER_STREAMS_FUNCTION, account).await?;
        decode_stream_columns(account, QueryDirection::Incoming, &body).map_err(Into::into)
    }
}

/// Error body shape returned by the fullnode REST API.
#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    message: String,
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator with jitter.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter_factor: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
            jitter_factor: config.jitter_factor,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(self.jittered(backoff))
    }

    /// Spread a delay within `backoff ± backoff * jitter_factor`, capped at
    /// the configured maximum.
    fn jittered(&self, backoff: Duration) -> Duration {
        if self.jitter_factor <= 0.0 {
            return backoff;
        }

        let base = backoff.as_secs_f64();
        let spread = base * self.jitter_factor;
        let mut rng = rand::rng();
        let jittered = rng.random_range((base - spread).max(0.0)..=base + spread);

        Duration::from_secs_f64(jittered.min(self.max_backoff.as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config(jitter_factor: f64) -> RetryConfig {
        RetryConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor,
        }
    }

    #[test]
    fn categorize_rate_limited() {
        assert!(matches!(
            categorize_status(StatusCode::TOO_MANY_REQUESTS),
            ErrorCategory::RateLimited
        ));
    }

    #[test]
    fn categorize_retryable() {
        assert!(matches!(
            categorize_status(StatusCode::INTERNAL_SERVER_ERROR),
            ErrorCategory::Retryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::BAD_GATEWAY),
            ErrorCategory::Retryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::SERVICE_UNAVAILABLE),
            ErrorCategory::Retryable
        ));
    }

    #[test]
    fn categorize_non_retryable() {
        assert!(matches!(
            categorize_status(StatusCode::BAD_REQUEST),
            ErrorCategory::NonRetryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::NOT_FOUND),
            ErrorCategory::NonRetryable
        ));
        assert!(matches!(
            categorize_status(StatusCode::UNAUTHORIZED),
            ErrorCategory::NonRetryable
        ));
    }

    #[test]
    fn exponential_backoff_increments_without_jitter() {
        let mut backoff = ExponentialBackoff::new(&retry_config(0.0));

        assert_eq!(backoff.next_backoff().unwrap(), Duration::from_millis(100));
        assert_eq!(backoff.next_backoff().unwrap(), Duration::from_millis(200));
        assert_eq!(backoff.next_backoff().unwrap(), Duration::from_millis(400));
        assert_eq!(backoff.next_backoff().unwrap(), Duration::from_millis(800));

        // Attempt 5 >= max_attempts 5.
        assert!(backoff.next_backoff().is_none());
    }

    #[test]
    fn exponential_backoff_respects_max() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            multiplier: 10.0,
            jitter_factor: 0.0,
        };
        let mut backoff = ExponentialBackoff::new(&config);

        backoff.next_backoff();
        // 10s uncapped, clamped to 5s.
        assert_eq!(backoff.next_backoff().unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let mut backoff = ExponentialBackoff::new(&retry_config(0.5));

        for _ in 0..50 {
            backoff.attempt = 0;
            backoff.current_backoff = Duration::from_millis(100);
            let delay = backoff.next_backoff().unwrap();
            assert!(delay >= Duration::from_millis(50), "delay {delay:?} below spread");
            assert!(delay <= Duration::from_millis(150), "delay {delay:?} above spread");
        }
    }

    #[test]
    fn node_error_body_extracts_message() {
        let body = r#"{"message":"invalid view function","error_code":"invalid_input"}"#;
        let parsed: NodeErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.message, "invalid view function");
    }
}
