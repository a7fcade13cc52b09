//! Aptos Fullnode Adapter
//!
//! Implementation of `LedgerQueryPort` against the fullnode REST API with:
//! - View function calls over `/v1/view`
//! - Retry logic with jittered exponential backoff
//! - Tolerant decoding of the five-column stream response

mod client;
mod config;
mod error;
mod view;

pub use client::AptosViewClient;
pub use config::{AptosClientConfig, DEFAULT_NODE_URL, RetryConfig};
pub use error::AptosClientError;
