//! Aptos adapter error types.

use thiserror::Error;

use crate::application::ports::LedgerQueryError;

/// Errors from the Aptos view client.
#[derive(Debug, Error, Clone)]
pub enum AptosClientError {
    /// Network error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// The fullnode answered with a non-success status.
    #[error("View call rejected ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the node.
        message: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Payload did not match the view function contract.
    #[error("Malformed view response: {0}")]
    MalformedResponse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl From<AptosClientError> for LedgerQueryError {
    fn from(err: AptosClientError) -> Self {
        match err {
            AptosClientError::Network(message) => Self::Transport { message },
            AptosClientError::MaxRetriesExceeded { attempts } => Self::Transport {
                message: format!("max retries exceeded after {attempts} attempts"),
            },
            AptosClientError::Api { status, message } => Self::Rejected { status, message },
            AptosClientError::JsonParse(message)
            | AptosClientError::MalformedResponse(message) => Self::MalformedResponse { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_maps_to_transport() {
        let err = AptosClientError::Network("connection refused".to_string());
        let port_err: LedgerQueryError = err.into();
        assert!(matches!(port_err, LedgerQueryError::Transport { .. }));
    }

    #[test]
    fn retries_exhausted_maps_to_transport() {
        let err = AptosClientError::MaxRetriesExceeded { attempts: 3 };
        let port_err: LedgerQueryError = err.into();
        assert!(matches!(port_err, LedgerQueryError::Transport { .. }));
    }

    #[test]
    fn api_maps_to_rejected() {
        let err = AptosClientError::Api {
            status: 400,
            message: "invalid function".to_string(),
        };
        let port_err: LedgerQueryError = err.into();
        assert!(matches!(
            port_err,
            LedgerQueryError::Rejected { status: 400, .. }
        ));
    }

    #[test]
    fn bad_payloads_map_to_malformed() {
        let parse = AptosClientError::JsonParse("unexpected token".to_string());
        let shape = AptosClientError::MalformedResponse("column length mismatch".to_string());
        assert!(LedgerQueryError::from(parse).is_malformed());
        assert!(LedgerQueryError::from(shape).is_malformed());
    }
}
