//! Rate and Health Endpoints
//!
//! HTTP endpoint for the published rate, health checks, and Prometheus metrics.
//! Used by dashboards, container orchestrators, and monitoring systems.
//!
//! # Endpoints
//!
//! - `GET /rate` - Returns the current rate snapshot as JSON
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Kubernetes liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::application::services::RateSnapshot;
use crate::infrastructure::metrics::get_metrics_handle;

/// A snapshot older than this many poll intervals marks the monitor degraded.
const STALE_CYCLES: u64 = 3;

// =============================================================================
// Response Types
// =============================================================================

/// Rate endpoint response.
#[derive(Debug, Clone, Serialize)]
pub struct RateResponse {
    /// Current snapshot, tagged by state.
    #[serde(flatten)]
    pub snapshot: RateSnapshot,
    /// Human-readable scaled rate.
    pub display: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded".
    pub status: HealthStatus,
    /// Monitor version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Monitor snapshot status.
    pub monitor: MonitorStatus,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Snapshot is current or nothing is being watched.
    Healthy,
    /// Snapshot has not been refreshed for several poll intervals.
    Degraded,
}

/// Monitor snapshot status.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    /// Snapshot state: "idle" or "current".
    pub state: String,
    /// Age of the last published rate in milliseconds, if any.
    pub snapshot_age_ms: Option<u64>,
}

// =============================================================================
// Rate Server State
// =============================================================================

/// Shared state for the rate server.
pub struct RateServerState {
    version: String,
    started_at: Instant,
    snapshot_rx: watch::Receiver<RateSnapshot>,
    poll_interval: Duration,
}

impl RateServerState {
    /// Create new rate server state.
    #[must_use]
    pub fn new(snapshot_rx: watch::Receiver<RateSnapshot>, poll_interval: Duration) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            snapshot_rx,
            poll_interval,
        }
    }
}

// =============================================================================
// Rate Server
// =============================================================================

/// Rate and health check HTTP server.
pub struct RateServer {
    port: u16,
    state: Arc<RateServerState>,
    cancel: CancellationToken,
}

impl RateServer {
    /// Create a new rate server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<RateServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the rate server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `RateServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), RateServerError> {
        let app = Router::new()
            .route("/rate", get(rate_handler))
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RateServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Rate server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| RateServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Rate server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn rate_handler(State(state): State<Arc<RateServerState>>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    let display = snapshot.display();
    Json(RateResponse { snapshot, display })
}

async fn health_handler(State(state): State<Arc<RateServerState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(build_health_response(&state)))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &RateServerState) -> HealthResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    let snapshot_age_ms = snapshot.updated_at().map(|updated_at| {
        Utc::now()
            .signed_duration_since(updated_at)
            .num_milliseconds()
            .max(0) as u64
    });
    let stale_after_ms = (state.poll_interval.as_millis() as u64).saturating_mul(STALE_CYCLES);

    HealthResponse {
        status: determine_health_status(snapshot_age_ms, stale_after_ms),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        monitor: MonitorStatus {
            state: snapshot_state_label(&snapshot).to_string(),
            snapshot_age_ms,
        },
    }
}

const fn snapshot_state_label(snapshot: &RateSnapshot) -> &'static str {
    match snapshot {
        RateSnapshot::Idle => "idle",
        RateSnapshot::Current { .. } => "current",
    }
}

const fn determine_health_status(snapshot_age_ms: Option<u64>, stale_after_ms: u64) -> HealthStatus {
    match snapshot_age_ms {
        Some(age) if age > stale_after_ms => HealthStatus::Degraded,
        _ => HealthStatus::Healthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Rate server errors.
#[derive(Debug, thiserror::Error)]
pub enum RateServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stream::AccountAddress;

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }

    #[test]
    fn determine_status_fresh_snapshot() {
        assert_eq!(determine_health_status(Some(1_000), 15_000), HealthStatus::Healthy);
    }

    #[test]
    fn determine_status_idle_snapshot() {
        assert_eq!(determine_health_status(None, 15_000), HealthStatus::Healthy);
    }

    #[test]
    fn determine_status_stale_snapshot() {
        assert_eq!(
            determine_health_status(Some(15_001), 15_000),
            HealthStatus::Degraded
        );
    }

    #[test]
    fn determine_status_boundary_age_is_healthy() {
        assert_eq!(determine_health_status(Some(15_000), 15_000), HealthStatus::Healthy);
    }

    #[test]
    fn snapshot_state_labels() {
        assert_eq!(snapshot_state_label(&RateSnapshot::Idle), "idle");
        let current = RateSnapshot::Current {
            account: AccountAddress::new("0xa"),
            rate_per_second: 0.5,
            updated_at: Utc::now(),
        };
        assert_eq!(snapshot_state_label(&current), "current");
    }

    #[test]
    fn rate_response_serialization() {
        let snapshot = RateSnapshot::Current {
            account: AccountAddress::new("0xAbC"),
            rate_per_second: 0.5,
            updated_at: Utc::now(),
        };
        let display = snapshot.display();
        let value = serde_json::to_value(RateResponse { snapshot, display }).unwrap();

        assert_eq!(value["state"], "current");
        assert_eq!(value["account"], "0xabc");
        assert_eq!(value["display"], "30 APT / min");
    }

    #[test]
    fn idle_rate_response_serialization() {
        let value = serde_json::to_value(RateResponse {
            snapshot: RateSnapshot::Idle,
            display: RateSnapshot::Idle.display(),
        })
        .unwrap();

        assert_eq!(value["state"], "idle");
        assert_eq!(value["display"], "0 APT / s");
    }
}
