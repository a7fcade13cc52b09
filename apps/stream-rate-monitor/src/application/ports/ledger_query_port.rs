//! Ledger Query Port (Driven Port)
//!
//! Interface for fetching a user's payment streams from the ledger.
//!
//! Both queries return complete snapshots: an account with no streams is
//! `Ok` with an empty vector, which is a different outcome from any
//! error. Implementations must not collapse failures into empty results.

use async_trait::async_trait;

use crate::domain::stream::{AccountAddress, StreamRecord};

/// Ledger query error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerQueryError {
    /// The ledger node could not be reached or did not answer in time.
    #[error("Ledger transport error: {message}")]
    Transport {
        /// Error details.
        message: String,
    },

    /// The ledger answered with a non-success status.
    #[error("Ledger rejected the query ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the node.
        status: u16,
        /// Error details.
        message: String,
    },

    /// The ledger answered but the payload did not match the expected shape.
    #[error("Malformed ledger response: {message}")]
    MalformedResponse {
        /// What was wrong with the payload.
        message: String,
    },
}

impl LedgerQueryError {
    /// Whether the payload was structurally invalid.
    ///
    /// The refresh cycle treats this case as "no streams on that side"
    /// instead of abandoning the whole cycle.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}

/// Port for querying payment streams by account.
#[async_trait]
pub trait LedgerQueryPort: Send + Sync {
    /// Streams where `account` is the sender (outgoing payments).
    async fn sender_streams(
        &self,
        account: &AccountAddress,
    ) -> Result<Vec<StreamRecord>, LedgerQueryError>;

    /// Streams where `account` is the recipient (incoming payments).
    async fn receiver_streams(
        &self,
        account: &AccountAddress,
    ) -> Result<Vec<StreamRecord>, LedgerQueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_is_distinguished() {
        let malformed = LedgerQueryError::MalformedResponse {
            message: "short column".to_string(),
        };
        let transport = LedgerQueryError::Transport {
            message: "timed out".to_string(),
        };
        assert!(malformed.is_malformed());
        assert!(!transport.is_malformed());
    }

    #[test]
    fn errors_render_their_context() {
        let rejected = LedgerQueryError::Rejected {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(
            rejected.to_string(),
            "Ledger rejected the query (429): rate limited"
        );
    }
}
