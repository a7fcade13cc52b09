//! Rate Monitor Service
//!
//! Timer-driven refresh of a watched account's net payment stream rate.
//! Each tick fetches both stream directions from the ledger, classifies
//! the inbound side, aggregates the net per-second rate and publishes it
//! through a watch channel.
//!
//! # Cycle semantics
//!
//! - No watched account: the cycle publishes [`RateSnapshot::Idle`]
//!   without touching the ledger.
//! - A transport or rejection error on either side abandons the cycle;
//!   the previously published snapshot stays in place until the next
//!   tick succeeds.
//! - A malformed response zeroes only the affected side for that cycle.
//! - Switching the watched account bumps an epoch counter and resets the
//!   snapshot to idle; any cycle still in flight for the old account
//!   fails its epoch check and its result is discarded.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{LedgerQueryError, LedgerQueryPort};
use crate::domain::rate::{ScaledRate, net_rate_per_second};
use crate::domain::stream::{AccountAddress, ClassifiedStreams, StreamRecord};
use crate::infrastructure::metrics as monitor_metrics;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the rate monitor service.
#[derive(Debug, Clone)]
pub struct RateMonitorConfig {
    /// Interval between refresh cycles (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for RateMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
        }
    }
}

impl RateMonitorConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// Published snapshot
// =============================================================================

/// The rate state published after each completed refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RateSnapshot {
    /// No account is being watched.
    Idle,
    /// Latest completed refresh for the watched account.
    Current {
        /// Account the rate was computed for.
        account: AccountAddress,
        /// Signed net rate in APT per second.
        rate_per_second: f64,
        /// When the refresh cycle completed.
        updated_at: DateTime<Utc>,
    },
}

impl RateSnapshot {
    /// Net rate in APT per second; idle reads as zero.
    #[must_use]
    pub const fn rate_per_second(&self) -> f64 {
        match self {
            Self::Idle => 0.0,
            Self::Current {
                rate_per_second, ..
            } => *rate_per_second,
        }
    }

    /// The rate escalated to its display unit.
    #[must_use]
    pub fn scaled(&self) -> ScaledRate {
        ScaledRate::from_per_second(self.rate_per_second())
    }

    /// Human-readable rate string such as `"1.44 APT / day"`.
    #[must_use]
    pub fn display(&self) -> String {
        self.scaled().to_string()
    }

    /// Completion time of the refresh that produced this snapshot.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Idle => None,
            Self::Current { updated_at, .. } => Some(*updated_at),
        }
    }
}

// =============================================================================
// Cycle outcome
// =============================================================================

/// How a refresh cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A fresh snapshot was published.
    Updated,
    /// No account is watched; the idle snapshot was published.
    Idle,
    /// A ledger query failed; the previous snapshot was retained.
    Failed,
    /// The watched account changed mid-flight; the result was discarded.
    Stale,
}

impl CycleOutcome {
    /// Static label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Idle => "idle",
            Self::Failed => "failed",
            Self::Stale => "stale",
        }
    }
}

/// Which ledger query a log or metric refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuerySide {
    /// `sender_streams` (outgoing payments).
    Sender,
    /// `receiver_streams` (incoming payments).
    Receiver,
}

impl QuerySide {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Rate monitor service polling the ledger for a watched account.
pub struct RateMonitorService<L: LedgerQueryPort> {
    /// Configuration.
    config: RateMonitorConfig,
    /// Ledger adapter for stream queries.
    ledger: Arc<L>,
    /// Currently watched account, if any.
    watched: Arc<RwLock<Option<AccountAddress>>>,
    /// Bumped on every account change; stale cycles fail this check.
    epoch: Arc<AtomicU64>,
    /// Publisher for the latest snapshot.
    snapshot_tx: Arc<watch::Sender<RateSnapshot>>,
    /// Cancellation token for graceful shutdown.
    shutdown: CancellationToken,
}

impl<L: LedgerQueryPort + 'static> RateMonitorService<L> {
    /// Create a new rate monitor with the default configuration.
    #[must_use]
    pub fn new(ledger: Arc<L>, shutdown: CancellationToken) -> Self {
        Self::with_config(RateMonitorConfig::default(), ledger, shutdown)
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(
        config: RateMonitorConfig,
        ledger: Arc<L>,
        shutdown: CancellationToken,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(RateSnapshot::Idle);

        Self {
            config,
            ledger,
            watched: Arc::new(RwLock::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
            snapshot_tx: Arc::new(snapshot_tx),
            shutdown,
        }
    }

    /// Change the watched account.
    ///
    /// Setting the same account again is a no-op. Any actual change bumps
    /// the epoch and resets the published snapshot to idle, so a stale
    /// account's rate is never shown against the new one.
    pub fn set_account(&self, account: Option<AccountAddress>) {
        let mut watched = self.watched.write();
        if *watched == account {
            return;
        }

        *watched = account.clone();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.snapshot_tx.send_replace(RateSnapshot::Idle);
        drop(watched);

        match account {
            Some(account) => tracing::info!(account = %account, "Watching account"),
            None => tracing::info!("Cleared watched account"),
        }
    }

    /// The currently watched account, if any.
    #[must_use]
    pub fn watched_account(&self) -> Option<AccountAddress> {
        self.watched.read().clone()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> RateSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RateSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Start the refresh loop as a background task.
    ///
    /// The first cycle runs immediately; subsequent cycles follow the
    /// configured poll interval until the shutdown token is cancelled.
    pub fn start(&self) {
        let ledger = Arc::clone(&self.ledger);
        let watched = Arc::clone(&self.watched);
        let epoch = Arc::clone(&self.epoch);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let shutdown = self.shutdown.clone();
        let poll_interval = self.config.poll_interval();

        tracing::info!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            "Starting rate monitor"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let outcome =
                            run_refresh_cycle(&ledger, &watched, &epoch, &snapshot_tx).await;
                        monitor_metrics::record_refresh_cycle(outcome.as_str());
                    }
                    () = shutdown.cancelled() => {
                        tracing::info!("Rate monitor shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// Run a single refresh cycle immediately.
    pub async fn refresh_once(&self) -> CycleOutcome {
        let outcome =
            run_refresh_cycle(&self.ledger, &self.watched, &self.epoch, &self.snapshot_tx).await;
        monitor_metrics::record_refresh_cycle(outcome.as_str());
        outcome
    }
}

// =============================================================================
// Refresh cycle
// =============================================================================

/// Execute one refresh cycle against the ledger.
async fn run_refresh_cycle<L: LedgerQueryPort>(
    ledger: &Arc<L>,
    watched: &Arc<RwLock<Option<AccountAddress>>>,
    epoch: &Arc<AtomicU64>,
    snapshot_tx: &Arc<watch::Sender<RateSnapshot>>,
) -> CycleOutcome {
    let (account, cycle_epoch) = {
        let guard = watched.read();
        (guard.clone(), epoch.load(Ordering::SeqCst))
    };

    let Some(account) = account else {
        snapshot_tx.send_replace(RateSnapshot::Idle);
        return CycleOutcome::Idle;
    };

    let cycle_id = Uuid::new_v4();
    let started = Instant::now();

    let (outbound, inbound) = tokio::join!(
        timed_query(QuerySide::Sender, ledger.sender_streams(&account)),
        timed_query(QuerySide::Receiver, ledger.receiver_streams(&account)),
    );

    let Some(outbound) = resolve_side(cycle_id, QuerySide::Sender, outbound) else {
        return CycleOutcome::Failed;
    };
    let Some(inbound) = resolve_side(cycle_id, QuerySide::Receiver, inbound) else {
        return CycleOutcome::Failed;
    };

    // Inbound streams are classified first and only active ones earn;
    // outbound streams count against the rate in every lifecycle state.
    let classified = ClassifiedStreams::partition(now_unix_ms(), inbound);
    let rate_per_second = net_rate_per_second(&classified.active, &outbound);

    // Verify and publish under the account lock so a concurrent switch
    // cannot slip between the epoch check and the publish.
    {
        let _guard = watched.read();
        if epoch.load(Ordering::SeqCst) != cycle_epoch {
            tracing::debug!(
                cycle_id = %cycle_id,
                account = %account,
                "Watched account changed mid-cycle; discarding result"
            );
            return CycleOutcome::Stale;
        }

        snapshot_tx.send_replace(RateSnapshot::Current {
            account: account.clone(),
            rate_per_second,
            updated_at: Utc::now(),
        });
    }

    monitor_metrics::record_refresh_duration(started.elapsed());
    monitor_metrics::set_net_rate(rate_per_second);

    tracing::debug!(
        cycle_id = %cycle_id,
        account = %account,
        active_inbound = classified.active.len(),
        pending_inbound = classified.pending.len(),
        completed_inbound = classified.completed.len(),
        outbound = outbound.len(),
        rate_per_second,
        display = %ScaledRate::from_per_second(rate_per_second),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Refresh cycle complete"
    );

    CycleOutcome::Updated
}

/// Run one side's query and record its latency.
async fn timed_query<T>(side: QuerySide, query: impl Future<Output = T>) -> T {
    let started = Instant::now();
    let result = query.await;
    monitor_metrics::record_query_duration(side.as_str(), started.elapsed());
    result
}

/// Resolve one side's query result.
///
/// `Some(streams)` participates in the cycle; `None` abandons it. A
/// malformed payload degrades to an empty side rather than abandoning.
fn resolve_side(
    cycle_id: Uuid,
    side: QuerySide,
    result: Result<Vec<StreamRecord>, LedgerQueryError>,
) -> Option<Vec<StreamRecord>> {
    match result {
        Ok(streams) => {
            monitor_metrics::record_ledger_query(side.as_str(), "ok");
            Some(streams)
        }
        Err(error) if error.is_malformed() => {
            monitor_metrics::record_ledger_query(side.as_str(), "malformed");
            tracing::warn!(
                cycle_id = %cycle_id,
                side = side.as_str(),
                error = %error,
                "Malformed ledger response; treating side as empty"
            );
            Some(Vec::new())
        }
        Err(error) => {
            monitor_metrics::record_ledger_query(side.as_str(), "error");
            tracing::warn!(
                cycle_id = %cycle_id,
                side = side.as_str(),
                error = %error,
                "Ledger query failed; keeping previous rate"
            );
            None
        }
    }
}

/// Current wall-clock time in unix milliseconds.
fn now_unix_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
