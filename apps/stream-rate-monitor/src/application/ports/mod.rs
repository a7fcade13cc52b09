//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! The monitor has a single driven port: the ledger view queries that
//! return a user's payment streams.

mod ledger_query_port;

pub use ledger_query_port::{LedgerQueryError, LedgerQueryPort};
