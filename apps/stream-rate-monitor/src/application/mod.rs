//! Application Layer - Ports and services.
//!
//! This layer contains the ledger port interface and the long-running
//! service that drives refresh cycles against it.

/// Port interfaces for external systems (ledger queries).
pub mod ports;

/// Application services (rate monitoring).
pub mod services;
