//! Trait abstractions for the engine's collaborators.
//!
//! The feed traits ([`SnapshotSource`], [`ForecastSource`]) abstract over the
//! real HTTP client and the mock feed used in tests. [`MapView`] and [`Clock`]
//! are the seams to the presentation layer and the wall clock.

use async_trait::async_trait;
use time::UtcOffset;

use skyfleet_types::{ForecastPayload, Position, Snapshot};

use crate::error::Result;
use crate::weather::ForecastQuery;

/// A source of hourly fleet snapshots.
///
/// # Example
///
/// ```ignore
/// use skyfleet_core::{SnapshotSource, Result};
///
/// async fn fleet_size<S: SnapshotSource>(source: &S) -> Result<usize> {
///     Ok(source.fetch_snapshot(0).await?.len())
/// }
/// ```
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the snapshot for `hour` hours ago (0 = current hour).
    ///
    /// Non-success statuses, transport errors and unparseable bodies are all
    /// reported as errors; callers decide whether to skip.
    async fn fetch_snapshot(&self, hour: u8) -> Result<Snapshot>;
}

/// A source of hourly forecasts for a position.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Fetch the forecast window described by `query`.
    async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<ForecastPayload>;
}

/// The map widget collaborator.
///
/// The engine only ever asks the map to recentre; marker rendering and
/// clustering read [`TrajectoryStore::latest_positions`](crate::TrajectoryStore::latest_positions)
/// directly.
pub trait MapView: Send + Sync {
    /// Pan the map so `position` is centred.
    fn pan_to(&self, position: Position);
}

/// Wall-clock collaborator supplying the hour the slider is anchored to.
pub trait Clock: Send + Sync {
    /// Current hour of day, 0-23, in the clock's own timezone.
    fn current_hour(&self) -> u8;

    /// Current hour of day, 0-23, at a fixed UTC offset.
    ///
    /// Used once a forecast reports the offset its hourly window is in.
    fn hour_at(&self, offset: UtcOffset) -> u8;
}
