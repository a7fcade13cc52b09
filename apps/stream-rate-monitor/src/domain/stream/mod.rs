//! Payment Stream Types
//!
//! Domain types for time-bounded token payment streams and their
//! lifecycle classification.
//!
//! # Design
//!
//! A stream releases a fixed token amount linearly over a fixed duration
//! from a sender to a recipient. Records are read-only snapshots fetched
//! from the ledger; classification is a pure function of the record and
//! an observation time, so a fresh snapshot is re-classified every
//! refresh cycle instead of mutating state in place.
//!
//! Timestamps and durations are in milliseconds. A `start_time_ms` of
//! zero is the ledger's sentinel for a stream that has been created but
//! not yet accepted, so it never counts toward the flow rate.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Identifiers
// =============================================================================

/// Unique identifier for a payment stream, scoped to a (sender, recipient) pair.
pub type StreamId = u64;

/// An Aptos account address in hex string form.
///
/// Addresses are normalized to lowercase so equality checks and log
/// output are stable regardless of how the caller cased the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountAddress(String);

impl AccountAddress {
    /// Create a new address, normalized to lowercase.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().to_lowercase())
    }

    /// Get the address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AccountAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccountAddress {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AccountAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// =============================================================================
// Token units
// =============================================================================

/// Base units (octas) per whole APT token.
pub const OCTAS_PER_APT: f64 = 100_000_000.0;

/// Display symbol for the streamed token.
pub const TOKEN_SYMBOL: &str = "APT";

/// Convert an integer octa amount into whole APT.
#[must_use]
pub fn apt_from_octas(octas: u64) -> f64 {
    octas as f64 / OCTAS_PER_APT
}

// =============================================================================
// Stream record
// =============================================================================

/// A single payment stream snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Account paying into the stream.
    pub sender: AccountAddress,
    /// Account receiving from the stream.
    pub recipient: AccountAddress,
    /// Total amount released over the full duration, in whole APT.
    pub amount_apt: f64,
    /// Start timestamp in milliseconds; `0` means not yet started.
    pub start_time_ms: u64,
    /// Stream length in milliseconds.
    pub duration_ms: u64,
    /// Ledger-assigned stream identifier.
    pub stream_id: StreamId,
}

impl StreamRecord {
    /// Per-second flow rate of this stream in APT.
    ///
    /// A zero-duration stream releases its entire amount instantaneously;
    /// it has no meaningful rate and contributes `0.0` rather than a
    /// division-by-zero infinity. The result is always finite.
    #[must_use]
    pub fn rate_per_second(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.amount_apt / self.duration_ms as f64
    }

    /// Whether the stream has started (accepted by the recipient).
    #[must_use]
    pub fn has_started(&self) -> bool {
        self.start_time_ms != 0
    }

    /// Timestamp at which the stream finishes releasing, in milliseconds.
    #[must_use]
    pub fn end_time_ms(&self) -> u64 {
        self.start_time_ms.saturating_add(self.duration_ms)
    }

    /// Classify this stream relative to an observation time.
    ///
    /// A stream whose end falls exactly on `now_ms` is still [`StreamStatus::Active`];
    /// only streams strictly past their end are completed.
    #[must_use]
    pub fn status_at(&self, now_ms: u64) -> StreamStatus {
        if !self.has_started() {
            StreamStatus::Pending
        } else if self.end_time_ms() < now_ms {
            StreamStatus::Completed
        } else {
            StreamStatus::Active
        }
    }
}

// =============================================================================
// Lifecycle classification
// =============================================================================

/// Lifecycle state of a payment stream at an observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// Created but not yet accepted; start time is the zero sentinel.
    Pending,
    /// Started and still releasing tokens.
    Active,
    /// Finished releasing; end time is strictly in the past.
    Completed,
}

impl StreamStatus {
    /// Static label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Streams partitioned by lifecycle state.
///
/// Every input record lands in exactly one bucket; none are dropped or
/// duplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedStreams {
    /// Streams awaiting acceptance.
    pub pending: Vec<StreamRecord>,
    /// Streams currently releasing tokens.
    pub active: Vec<StreamRecord>,
    /// Streams that finished releasing.
    pub completed: Vec<StreamRecord>,
}

impl ClassifiedStreams {
    /// Partition records by their status at `now_ms`.
    #[must_use]
    pub fn partition(now_ms: u64, records: impl IntoIterator<Item = StreamRecord>) -> Self {
        let mut classified = Self::default();
        for record in records {
            match record.status_at(now_ms) {
                StreamStatus::Pending => classified.pending.push(record),
                StreamStatus::Active => classified.active.push(record),
                StreamStatus::Completed => classified.completed.push(record),
            }
        }
        classified
    }

    /// Total number of classified streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + self.active.len() + self.completed.len()
    }

    /// Whether no streams were classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
