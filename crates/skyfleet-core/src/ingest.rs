//! Snapshot ingestion.
//!
//! The ingestor requests every hourly snapshot (`00.json` through `23.json`),
//! tolerates any subset failing, and folds the settled results into a
//! [`TrajectoryStore`]. Fetches may run concurrently or one after another;
//! the store is built from the settled results in a single reduction either
//! way, so arrival order never matters.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use skyfleet_types::Snapshot;

use crate::error::Result;
use crate::retry::{RetryConfig, with_retry};
use crate::traits::SnapshotSource;
use crate::trajectory::TrajectoryStore;

/// Number of hourly snapshots in the lookback window.
pub const SNAPSHOT_COUNT: u8 = 24;

/// Resource name of the snapshot for `hour` hours ago.
///
/// ```
/// use skyfleet_core::ingest::snapshot_path;
///
/// assert_eq!(snapshot_path(0), "00.json");
/// assert_eq!(snapshot_path(23), "23.json");
/// ```
pub fn snapshot_path(hour: u8) -> String {
    format!("{:02}.json", hour)
}

/// Options for an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Hours to request, starting at 0. At most [`SNAPSHOT_COUNT`].
    pub snapshot_count: u8,
    /// Request every hour at once rather than one after another.
    pub concurrent: bool,
    /// Reject snapshots whose object count differs from the reference.
    pub strict_alignment: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            snapshot_count: SNAPSHOT_COUNT,
            concurrent: true,
            strict_alignment: false,
        }
    }
}

impl IngestOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of hours to request (clamped to the lookback window).
    #[must_use]
    pub fn snapshot_count(mut self, count: u8) -> Self {
        self.snapshot_count = count.min(SNAPSHOT_COUNT);
        self
    }

    /// Request hours concurrently or sequentially.
    #[must_use]
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Enable or disable strict alignment checks.
    #[must_use]
    pub fn strict_alignment(mut self, strict: bool) -> Self {
        self.strict_alignment = strict;
        self
    }
}

/// What happened to one snapshot hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// Parsed and merged into the store.
    Loaded { objects: usize },
    /// Fetch or parse failed; the hour contributes nothing.
    Failed { reason: String },
    /// Object count disagreed with the reference snapshot and was rejected.
    Misaligned { objects: usize, expected: usize },
}

impl SnapshotOutcome {
    /// Whether the snapshot was merged.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Outcome for a single hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourOutcome {
    pub hour: u8,
    #[serde(flatten)]
    pub outcome: SnapshotOutcome,
}

/// Result of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// The trajectories built from every accepted snapshot.
    pub store: TrajectoryStore,
    /// One entry per requested hour, in hour order.
    pub outcomes: Vec<HourOutcome>,
    /// When the run started.
    pub fetched_at: OffsetDateTime,
}

impl IngestReport {
    /// Number of hours merged into the store.
    pub fn loaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_loaded()).count()
    }

    /// Number of hours that contributed nothing.
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.loaded()
    }

    /// Take the store, dropping the per-hour outcomes.
    pub fn into_store(self) -> TrajectoryStore {
        self.store
    }
}

/// Fetches hourly snapshots and builds the trajectory store.
pub struct SnapshotIngestor {
    source: Arc<dyn SnapshotSource>,
    options: IngestOptions,
    retry: RetryConfig,
}

impl SnapshotIngestor {
    /// Create an ingestor with default options and the snapshot retry preset.
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self::with_options(source, IngestOptions::default())
    }

    /// Create an ingestor with custom options.
    pub fn with_options(source: Arc<dyn SnapshotSource>, options: IngestOptions) -> Self {
        Self {
            source,
            options,
            retry: RetryConfig::for_snapshot(),
        }
    }

    /// Set the retry policy applied to each snapshot request.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The ingestion options.
    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Request every hour and build the store.
    ///
    /// Never fails: each hour is either merged or recorded as skipped in the
    /// report. An empty store means no snapshot succeeded.
    pub async fn ingest_all(&self) -> IngestReport {
        let fetched_at = OffsetDateTime::now_utc();
        let hours = 0..self.options.snapshot_count.min(SNAPSHOT_COUNT);

        let results: Vec<(u8, Result<Snapshot>)> = if self.options.concurrent {
            let fetches = hours.map(|hour| async move { (hour, self.fetch(hour).await) });
            join_all(fetches).await
        } else {
            let mut results = Vec::with_capacity(hours.len());
            for hour in hours {
                results.push((hour, self.fetch(hour).await));
            }
            results
        };

        let report = settle(results, self.options.strict_alignment, fetched_at);
        info!(
            "Ingested {}/{} snapshots, tracking {} objects",
            report.loaded(),
            report.outcomes.len(),
            report.store.len()
        );
        report
    }

    async fn fetch(&self, hour: u8) -> Result<Snapshot> {
        let name = format!("Snapshot {}", snapshot_path(hour));
        let snapshot = with_retry(&self.retry, &name, || self.source.fetch_snapshot(hour)).await;
        if let Ok(s) = &snapshot {
            debug!("{} listed {} objects", name, s.len());
        }
        snapshot
    }
}

impl std::fmt::Debug for SnapshotIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotIngestor")
            .field("options", &self.options)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Fold settled fetches into a report.
///
/// The alignment reference is the object count of the most recent hour that
/// succeeded.
fn settle(
    mut results: Vec<(u8, Result<Snapshot>)>,
    strict_alignment: bool,
    fetched_at: OffsetDateTime,
) -> IngestReport {
    results.sort_by_key(|(hour, _)| *hour);

    let expected = results
        .iter()
        .find_map(|(_, r)| r.as_ref().ok().map(Snapshot::len));

    let mut accepted = Vec::new();
    let mut outcomes = Vec::with_capacity(results.len());

    for (hour, result) in results {
        let outcome = match result {
            Err(e) => {
                warn!("Snapshot {} skipped: {}", snapshot_path(hour), e);
                SnapshotOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Ok(snapshot) => {
                let objects = snapshot.len();
                match expected {
                    Some(expected) if objects != expected => {
                        warn!(
                            "Snapshot {} lists {} objects, expected {}; keys may be misaligned",
                            snapshot_path(hour),
                            objects,
                            expected
                        );
                        if strict_alignment {
                            SnapshotOutcome::Misaligned { objects, expected }
                        } else {
                            accepted.push((hour, snapshot));
                            SnapshotOutcome::Loaded { objects }
                        }
                    }
                    _ => {
                        accepted.push((hour, snapshot));
                        SnapshotOutcome::Loaded { objects }
                    }
                }
            }
        };
        outcomes.push(HourOutcome { hour, outcome });
    }

    let store = TrajectoryStore::from_snapshots(accepted.iter().map(|(hour, s)| (*hour, s)));
    IngestReport {
        store,
        outcomes,
        fetched_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockFeedBuilder;
    use skyfleet_types::{ObjectKey, Position};
    use std::time::Duration;

    fn fleet(n: usize, lat: f64) -> Vec<Position> {
        (0..n).map(|i| Position::new(lat, i as f64)).collect()
    }

    fn ingestor(feed: crate::mock::MockFeed, options: IngestOptions) -> SnapshotIngestor {
        SnapshotIngestor::with_options(Arc::new(feed), options).retry(RetryConfig::none())
    }

    #[test]
    fn test_options_default() {
        let options = IngestOptions::default();
        assert_eq!(options.snapshot_count, 24);
        assert!(options.concurrent);
        assert!(!options.strict_alignment);
        assert_eq!(IngestOptions::new().snapshot_count(40).snapshot_count, 24);
    }

    #[tokio::test]
    async fn test_all_hours_requested() {
        let feed = Arc::new(MockFeedBuilder::new().build());
        let ingestor = SnapshotIngestor::new(feed.clone()).retry(RetryConfig::none());

        let report = ingestor.ingest_all().await;

        assert_eq!(feed.snapshot_requests(), 24);
        assert_eq!(report.outcomes.len(), 24);
        assert_eq!(report.loaded(), 0);
        assert!(report.store.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let mut builder = MockFeedBuilder::new();
        for hour in 0..24u8 {
            builder = builder.snapshot(hour, fleet(3, f64::from(hour)));
        }
        let feed = builder.fail_snapshot(7).build();

        let report = ingestor(feed, IngestOptions::default()).ingest_all().await;

        assert_eq!(report.loaded(), 23);
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.outcomes[7].outcome,
            SnapshotOutcome::Failed { .. }
        ));

        let t = report.store.get(ObjectKey::new(2)).unwrap();
        assert_eq!(t.len(), 24);
        assert_eq!(t.recorded(), 23);
        for hour in (0..24).filter(|h| *h != 7) {
            assert_eq!(t.position_at(hour).unwrap(), Position::new(hour as f64, 2.0));
        }
        assert!(t.position_at(7).unwrap_err().is_no_data());
    }

    #[tokio::test]
    async fn test_concurrent_and_sequential_agree() {
        let build = || {
            MockFeedBuilder::new()
                .drifting_fleet(5, &fleet(2, 10.0))
                .fail_snapshot(2)
                .corrupt_snapshot(3)
                .latency(Duration::from_millis(2))
                .build()
        };

        let concurrent = ingestor(build(), IngestOptions::new().snapshot_count(5))
            .ingest_all()
            .await;
        let sequential = ingestor(build(), IngestOptions::new().snapshot_count(5).concurrent(false))
            .ingest_all()
            .await;

        assert_eq!(concurrent.outcomes, sequential.outcomes);
        for key in concurrent.store.keys() {
            assert_eq!(concurrent.store.get(key), sequential.store.get(key));
        }
    }

    #[tokio::test]
    async fn test_lenient_alignment_merges() {
        let feed = MockFeedBuilder::new()
            .snapshot(0, fleet(2, 0.0))
            .snapshot(1, fleet(3, 1.0))
            .build();

        let report = ingestor(feed, IngestOptions::new().snapshot_count(2))
            .ingest_all()
            .await;

        assert_eq!(report.loaded(), 2);
        assert_eq!(report.store.len(), 3);
    }

    #[tokio::test]
    async fn test_strict_alignment_rejects() {
        let feed = MockFeedBuilder::new()
            .fail_snapshot(0)
            .snapshot(1, fleet(2, 1.0))
            .snapshot(2, fleet(3, 2.0))
            .build();

        let report = ingestor(
            feed,
            IngestOptions::new().snapshot_count(3).strict_alignment(true),
        )
        .ingest_all()
        .await;

        // Reference is hour 1, the most recent success
        assert_eq!(
            report.outcomes[2].outcome,
            SnapshotOutcome::Misaligned {
                objects: 3,
                expected: 2
            }
        );
        assert_eq!(report.store.len(), 2);
        assert!(report.store.get(ObjectKey::new(2)).is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let feed = Arc::new(
            MockFeedBuilder::new()
                .snapshot(0, fleet(1, 0.0))
                .transient_failures(1)
                .build(),
        );
        let retry = RetryConfig::new(2)
            .initial_delay(Duration::from_millis(1))
            .jitter(false);
        let ingestor = SnapshotIngestor::with_options(
            feed.clone(),
            IngestOptions::new().snapshot_count(1),
        )
        .retry(retry);

        let report = ingestor.ingest_all().await;

        assert_eq!(report.loaded(), 1);
        assert_eq!(feed.snapshot_requests(), 2);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = HourOutcome {
            hour: 4,
            outcome: SnapshotOutcome::Loaded { objects: 12 },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["hour"], 4);
        assert_eq!(json["status"], "loaded");
        assert_eq!(json["objects"], 12);
    }
}
