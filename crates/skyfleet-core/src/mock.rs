//! Mock collaborators for testing.
//!
//! This module provides an in-memory feed that can be used for unit testing
//! without network access, plus stand-ins for the map and clock.
//!
//! [`MockFeed`] implements both [`SnapshotSource`] and [`ForecastSource`], so
//! it can be handed to the ingestor and the weather cache in place of the
//! HTTP client.
//!
//! # Features
//!
//! - **Failure injection**: fail specific snapshot hours, corrupt their
//!   bodies, or fail forecasts for specific coordinates
//! - **Transient failures**: fail the next N snapshot requests with a 503
//! - **Latency simulation**: delay every request to exercise concurrency
//! - **Request counters**: assert how much network work was issued

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use time::UtcOffset;
use tokio::sync::RwLock;

use skyfleet_types::{ForecastPayload, HourlySeries, HourlyUnits, ParseError, Position, Snapshot};

use crate::error::{Error, Result};
use crate::traits::{Clock, ForecastSource, MapView, SnapshotSource};
use crate::weather::ForecastQuery;

/// Hours in a default mock forecast window (`past_days=1`, `forecast_days=1`).
const DEFAULT_FORECAST_HOURS: usize = 48;

/// How a configured snapshot hour misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SnapshotFault {
    /// Connection dropped.
    Transport,
    /// Body arrived but does not parse.
    Corrupt,
}

/// An in-memory snapshot and forecast feed.
///
/// Hours without a configured snapshot answer with HTTP 404. Forecasts are
/// synthesized from the query: `latitude`/`longitude` echo the request and
/// `temperature_2m[i]` is `latitude + i`, so tests can tell which position a
/// payload was requested for.
///
/// # Example
///
/// ```
/// use skyfleet_core::{MockFeedBuilder, SnapshotSource};
/// use skyfleet_types::Position;
///
/// #[tokio::main]
/// async fn main() {
///     let feed = MockFeedBuilder::new()
///         .snapshot(0, vec![Position::new(10.0, 20.0)])
///         .fail_snapshot(1)
///         .build();
///
///     assert_eq!(feed.fetch_snapshot(0).await.unwrap().len(), 1);
///     assert!(feed.fetch_snapshot(1).await.is_err());
///     assert_eq!(feed.snapshot_requests(), 2);
/// }
/// ```
pub struct MockFeed {
    snapshots: RwLock<HashMap<u8, Snapshot>>,
    faults: RwLock<HashMap<u8, SnapshotFault>>,
    forecast_failures: RwLock<Vec<(f64, f64)>>,
    fail_all_forecasts: AtomicBool,
    forecast_hours: usize,
    forecast_utc_offset: Option<i32>,
    snapshot_requests: AtomicU32,
    forecast_requests: AtomicU32,
    /// Simulated latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    /// Snapshot requests still to fail with a 503 before succeeding.
    remaining_failures: AtomicU32,
}

impl std::fmt::Debug for MockFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFeed")
            .field("snapshot_requests", &self.snapshot_requests())
            .field("forecast_requests", &self.forecast_requests())
            .finish_non_exhaustive()
    }
}

impl Default for MockFeed {
    fn default() -> Self {
        MockFeedBuilder::new().build()
    }
}

impl MockFeed {
    /// Create an empty feed: every snapshot hour answers 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `positions` as the snapshot for `hour`.
    pub async fn set_snapshot(&self, hour: u8, positions: Vec<Position>) {
        self.faults.write().await.remove(&hour);
        self.snapshots
            .write()
            .await
            .insert(hour, Snapshot { positions });
    }

    /// Make `hour` fail with a transport error.
    pub async fn fail_snapshot(&self, hour: u8) {
        self.faults.write().await.insert(hour, SnapshotFault::Transport);
    }

    /// Make forecasts for `(lat, lng)` fail.
    pub async fn fail_forecast_at(&self, lat: f64, lng: f64) {
        self.forecast_failures.write().await.push((lat, lng));
    }

    /// Make every forecast request fail.
    pub fn set_fail_all_forecasts(&self, fail: bool) {
        self.fail_all_forecasts.store(fail, Ordering::Relaxed);
    }

    /// Number of snapshot requests received.
    pub fn snapshot_requests(&self) -> u32 {
        self.snapshot_requests.load(Ordering::Relaxed)
    }

    /// Number of forecast requests received.
    pub fn forecast_requests(&self) -> u32 {
        self.forecast_requests.load(Ordering::Relaxed)
    }

    /// Reset both request counters.
    pub fn reset_counts(&self) {
        self.snapshot_requests.store(0, Ordering::Relaxed);
        self.forecast_requests.store(0, Ordering::Relaxed);
    }

    /// Set simulated latency for every request.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Fail the next `count` snapshot requests with HTTP 503.
    ///
    /// Useful for exercising the retry policy.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Number of transient failures still to be served.
    pub fn remaining_failures(&self) -> u32 {
        self.remaining_failures.load(Ordering::Relaxed)
    }

    async fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::Relaxed);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    fn take_transient_failure(&self) -> bool {
        self.remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    fn forecast_payload(&self, query: &ForecastQuery) -> ForecastPayload {
        let hours = self.forecast_hours;
        ForecastPayload {
            latitude: Some(query.latitude),
            longitude: Some(query.longitude),
            timezone: Some(query.timezone.clone()),
            utc_offset_seconds: self.forecast_utc_offset,
            hourly: HourlySeries {
                time: (0..hours)
                    .map(|i| format!("2024-06-{:02}T{:02}:00", 1 + i / 24, i % 24))
                    .collect(),
                temperature_2m: (0..hours).map(|i| Some(query.latitude + i as f64)).collect(),
                precipitation: (0..hours).map(|i| Some((i % 3) as f64 * 0.01)).collect(),
                wind_speed_10m: (0..hours)
                    .map(|i| Some(query.longitude.abs() / 10.0 + i as f64))
                    .collect(),
            },
            hourly_units: Some(HourlyUnits {
                temperature_2m: Some("°F".to_string()),
                precipitation: Some("inch".to_string()),
                wind_speed_10m: Some("mp/h".to_string()),
            }),
        }
    }
}

#[async_trait]
impl SnapshotSource for MockFeed {
    async fn fetch_snapshot(&self, hour: u8) -> Result<Snapshot> {
        self.snapshot_requests.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        let url = format!("mock://snapshot/{:02}.json", hour);
        if self.take_transient_failure() {
            return Err(Error::fetch_status(url, 503));
        }

        match self.faults.read().await.get(&hour) {
            Some(SnapshotFault::Transport) => {
                return Err(Error::fetch_transport(url, "Mock connection reset"));
            }
            Some(SnapshotFault::Corrupt) => {
                return Err(Error::parse(url, ParseError::invalid("Mock corrupt body")));
            }
            None => {}
        }

        self.snapshots
            .read()
            .await
            .get(&hour)
            .cloned()
            .ok_or_else(|| Error::fetch_status(url, 404))
    }
}

#[async_trait]
impl ForecastSource for MockFeed {
    async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<ForecastPayload> {
        self.forecast_requests.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;

        let failing = self.fail_all_forecasts.load(Ordering::Relaxed)
            || self
                .forecast_failures
                .read()
                .await
                .iter()
                .any(|&(lat, lng)| lat == query.latitude && lng == query.longitude);
        if failing {
            let url = format!(
                "mock://forecast?latitude={}&longitude={}",
                query.latitude, query.longitude
            );
            return Err(Error::fetch_status(url, 500));
        }

        Ok(self.forecast_payload(query))
    }
}

/// Builder for creating mock feeds with custom settings.
#[derive(Debug, Default)]
pub struct MockFeedBuilder {
    snapshots: HashMap<u8, Snapshot>,
    faults: HashMap<u8, SnapshotFault>,
    forecast_failures: Vec<(f64, f64)>,
    fail_all_forecasts: bool,
    forecast_hours: Option<usize>,
    forecast_utc_offset: Option<i32>,
    latency: Duration,
    transient_failures: u32,
}

impl MockFeedBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `positions` as the snapshot for `hour`.
    #[must_use]
    pub fn snapshot(mut self, hour: u8, positions: Vec<Position>) -> Self {
        self.snapshots.insert(hour, Snapshot { positions });
        self
    }

    /// Serve the same fleet for hours `0..count`, drifting each object by
    /// `0.1°` of latitude per hour into the past.
    #[must_use]
    pub fn drifting_fleet(mut self, count: u8, origins: &[Position]) -> Self {
        for hour in 0..count {
            let positions = origins
                .iter()
                .map(|p| Position::new(p.lat + f64::from(hour) * 0.1, p.lng))
                .collect();
            self.snapshots.insert(hour, Snapshot { positions });
        }
        self
    }

    /// Make `hour` fail with a transport error.
    #[must_use]
    pub fn fail_snapshot(mut self, hour: u8) -> Self {
        self.faults.insert(hour, SnapshotFault::Transport);
        self
    }

    /// Make `hour` return an unparseable body.
    #[must_use]
    pub fn corrupt_snapshot(mut self, hour: u8) -> Self {
        self.faults.insert(hour, SnapshotFault::Corrupt);
        self
    }

    /// Make forecasts for `(lat, lng)` fail.
    #[must_use]
    pub fn fail_forecast_at(mut self, lat: f64, lng: f64) -> Self {
        self.forecast_failures.push((lat, lng));
        self
    }

    /// Make every forecast request fail.
    #[must_use]
    pub fn fail_all_forecasts(mut self, fail: bool) -> Self {
        self.fail_all_forecasts = fail;
        self
    }

    /// Length of the synthesized forecast window.
    #[must_use]
    pub fn forecast_hours(mut self, hours: usize) -> Self {
        self.forecast_hours = Some(hours);
        self
    }

    /// Report `seconds` as the forecasts' `utc_offset_seconds`.
    ///
    /// Without this the synthesized payloads carry no offset.
    #[must_use]
    pub fn forecast_utc_offset(mut self, seconds: i32) -> Self {
        self.forecast_utc_offset = Some(seconds);
        self
    }

    /// Delay every request by `latency`.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the first `count` snapshot requests with HTTP 503.
    #[must_use]
    pub fn transient_failures(mut self, count: u32) -> Self {
        self.transient_failures = count;
        self
    }

    /// Build the mock feed.
    #[must_use]
    pub fn build(self) -> MockFeed {
        MockFeed {
            snapshots: RwLock::new(self.snapshots),
            faults: RwLock::new(self.faults),
            forecast_failures: RwLock::new(self.forecast_failures),
            fail_all_forecasts: AtomicBool::new(self.fail_all_forecasts),
            forecast_hours: self.forecast_hours.unwrap_or(DEFAULT_FORECAST_HOURS),
            forecast_utc_offset: self.forecast_utc_offset,
            snapshot_requests: AtomicU32::new(0),
            forecast_requests: AtomicU32::new(0),
            latency_ms: AtomicU64::new(self.latency.as_millis() as u64),
            remaining_failures: AtomicU32::new(self.transient_failures),
        }
    }
}

/// [`MapView`] that records every pan request.
#[derive(Debug, Default)]
pub struct RecordingMapView {
    pans: Mutex<Vec<Position>>,
}

impl RecordingMapView {
    /// Create a map view with no recorded pans.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pan target, oldest first.
    pub fn pans(&self) -> Vec<Position> {
        self.pans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent pan target.
    pub fn last_pan(&self) -> Option<Position> {
        self.pans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }
}

impl MapView for RecordingMapView {
    fn pan_to(&self, position: Position) {
        self.pans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(position);
    }
}

/// [`Clock`] frozen at the top of a settable hour.
#[derive(Debug)]
pub struct FixedClock {
    hour: AtomicU8,
    zone: UtcOffset,
}

impl FixedClock {
    /// Clock reading `hour` (taken modulo 24) in UTC.
    pub fn new(hour: u8) -> Self {
        Self::in_zone(hour, UtcOffset::UTC)
    }

    /// Clock reading `hour` (taken modulo 24) in a zone at `zone`.
    pub fn in_zone(hour: u8, zone: UtcOffset) -> Self {
        Self {
            hour: AtomicU8::new(hour % 24),
            zone,
        }
    }

    /// Move the clock to `hour` (taken modulo 24).
    pub fn set_hour(&self, hour: u8) {
        self.hour.store(hour % 24, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn current_hour(&self) -> u8 {
        self.hour.load(Ordering::Relaxed)
    }

    fn hour_at(&self, offset: UtcOffset) -> u8 {
        let local = i64::from(self.current_hour()) * 3600;
        let shifted = local - i64::from(self.zone.whole_seconds()) + i64::from(offset.whole_seconds());
        shifted.div_euclid(3600).rem_euclid(24) as u8
    }
}
