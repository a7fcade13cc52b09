#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Stream Rate Monitor - Payment Stream Net Rate
//!
//! A monitor service that polls an Aptos fullnode for one account's token
//! payment streams and publishes the net flow rate, scaled to a time unit
//! where the number is readable.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core stream types and rate math
//!   - `stream`: Stream records, lifecycle classification
//!   - `rate`: Net rate aggregation and unit scaling
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interface for querying streams from the ledger
//!   - `services`: The polling rate monitor
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `aptos`: Fullnode view client implementing the ledger port
//!   - `config`: Environment configuration
//!   - `http`: Rate, health, and metrics endpoints
//!   - `metrics`: Prometheus instrumentation
//!   - `telemetry`: Tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! fullnode /v1/view --> AptosViewClient --> RateMonitorService --> watch channel --> GET /rate
//!                                                 |
//!                                                 +--> tracing / metrics
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core stream types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::rate::{RateUnit, ScaledRate, net_rate_per_second};
pub use domain::stream::{
    AccountAddress, ClassifiedStreams, StreamId, StreamRecord, StreamStatus,
};

// Application ports and services
pub use application::ports::{LedgerQueryError, LedgerQueryPort};
pub use application::services::{
    CycleOutcome, RateMonitorConfig, RateMonitorService, RateSnapshot,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, MonitorSettings, ServerSettings};

// Aptos adapter (for integration tests)
pub use infrastructure::aptos::{
    AptosClientConfig, AptosClientError, AptosViewClient, RetryConfig,
};

// Rate server
pub use infrastructure::http::{RateServer, RateServerError, RateServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
