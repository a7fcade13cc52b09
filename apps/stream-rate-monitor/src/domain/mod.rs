//! Domain Layer - Payment stream types and rate arithmetic.
//!
//! This layer contains the core domain logic for classifying payment
//! streams and computing net flow rates. All types here are pure Rust
//! with serialization support and no I/O.

/// Payment stream records, lifecycle classification.
pub mod stream;

/// Net rate aggregation and human-scaled display.
pub mod rate;
