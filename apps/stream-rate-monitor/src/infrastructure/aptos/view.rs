//! View function wire format.
//!
//! The payment stream module exposes two view functions that return one
//! account's streams as five parallel arrays, indexed consistently:
//!
//! ```text
//! [counterparties, start_times_ms, durations_ms, octa_amounts, stream_ids]
//! ```
//!
//! For the sender query the counterparty column holds recipients; for
//! the receiver query it holds senders. Numeric columns arrive either as
//! JSON numbers or as the node's u64-as-string encoding; both are
//! accepted. Any shape violation surfaces as
//! [`AptosClientError::MalformedResponse`].

use serde::Serialize;
use serde_json::Value;

use super::error::AptosClientError;
use crate::domain::stream::{AccountAddress, StreamRecord, apt_from_octas};

/// View function returning streams the account sends.
pub const SENDER_STREAMS_FUNCTION: &str = "get_senders_streams";

/// View function returning streams the account receives.
pub const RECEIVER_STREAMS_FUNCTION: &str = "get_receivers_streams";

/// Number of parallel columns in a stream view response.
const STREAM_COLUMNS: usize = 5;

// =============================================================================
// Request
// =============================================================================

/// Request body for a view function call.
#[derive(Debug, Clone, Serialize)]
pub struct ViewRequest {
    /// Fully qualified function identifier (`address::module::name`).
    pub function: String,
    /// Generic type arguments (always empty for stream queries).
    pub type_arguments: Vec<String>,
    /// Positional arguments.
    pub arguments: Vec<Value>,
}

impl ViewRequest {
    /// Build a stream query for one account.
    #[must_use]
    pub fn for_account(function: String, account: &AccountAddress) -> Self {
        Self {
            function,
            type_arguments: Vec::new(),
            arguments: vec![Value::String(account.as_str().to_string())],
        }
    }
}

// =============================================================================
// Response decoding
// =============================================================================

/// Which direction a stream query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDirection {
    /// `get_senders_streams`: the account pays; column 0 holds recipients.
    Outgoing,
    /// `get_receivers_streams`: the account is paid; column 0 holds senders.
    Incoming,
}

/// Decode a stream view response into records for `account`.
pub fn decode_stream_columns(
    account: &AccountAddress,
    direction: QueryDirection,
    body: &Value,
) -> Result<Vec<StreamRecord>, AptosClientError> {
    let columns = body
        .as_array()
        .ok_or_else(|| malformed("view response is not an array"))?;
    if columns.len() != STREAM_COLUMNS {
        return Err(malformed(format!(
            "expected {STREAM_COLUMNS} columns, got {}",
            columns.len()
        )));
    }

    let counterparties = column(columns, 0)?;
    let start_times = column(columns, 1)?;
    let durations = column(columns, 2)?;
    let amounts = column(columns, 3)?;
    let ids = column(columns, 4)?;

    let len = counterparties.len();
    if start_times.len() != len
        || durations.len() != len
        || amounts.len() != len
        || ids.len() != len
    {
        return Err(malformed("column length mismatch"));
    }

    let mut records = Vec::with_capacity(len);
    for i in 0..len {
        let counterparty = counterparties[i]
            .as_str()
            .ok_or_else(|| malformed(format!("counterparty at index {i} is not a string")))?;
        let start_time_ms = decode_u64(&start_times[i])
            .ok_or_else(|| malformed(format!("start time at index {i} is not a u64")))?;
        let duration_ms = decode_u64(&durations[i])
            .ok_or_else(|| malformed(format!("duration at index {i} is not a u64")))?;
        let octas = decode_u64(&amounts[i])
            .ok_or_else(|| malformed(format!("amount at index {i} is not a u64")))?;
        let stream_id = decode_u64(&ids[i])
            .ok_or_else(|| malformed(format!("stream id at index {i} is not a u64")))?;

        let (sender, recipient) = match direction {
            QueryDirection::Outgoing => (account.clone(), AccountAddress::new(counterparty)),
            QueryDirection::Incoming => (AccountAddress::new(counterparty), account.clone()),
        };

        records.push(StreamRecord {
            sender,
            recipient,
            amount_apt: apt_from_octas(octas),
            start_time_ms,
            duration_ms,
            stream_id,
        });
    }

    Ok(records)
}

/// Read a column by index, requiring it to be an array.
fn column(columns: &[Value], index: usize) -> Result<&Vec<Value>, AptosClientError> {
    columns[index]
        .as_array()
        .ok_or_else(|| malformed(format!("column {index} is not an array")))
}

/// Decode a u64 that may arrive as a JSON number or a decimal string.
fn decode_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn malformed(message: impl Into<String>) -> AptosClientError {
    AptosClientError::MalformedResponse(message.into())
}
