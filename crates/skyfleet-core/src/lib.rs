//! Trajectory aggregation and weather correlation for balloon fleets.
//!
//! This crate turns the hourly fleet snapshot feed into per-object position
//! histories and attaches a forecast to every historical position, without
//! ever issuing the same forecast batch twice.
//!
//! # Features
//!
//! - **Snapshot ingestion**: 24 hourly snapshots, concurrent or sequential,
//!   tolerant of any subset failing
//! - **Trajectory store**: hour-indexed position histories per object
//! - **Time index mapping**: one slider offset drives the trajectory slot,
//!   the forecast hour and the label
//! - **Weather cache**: per-object forecast batches, memoized for the session
//! - **Selection**: selected object, displayed hour, map recentring
//! - **Retry and timeouts**: transient feed failures are retried with backoff
//!
//! # Components
//!
//! | Component | Role |
//! |-----------|------|
//! | [`SnapshotIngestor`] | Fetches `00.json`..`23.json` and folds them into a store |
//! | [`TrajectoryStore`] | Read-only mapping from [`ObjectKey`] to [`Trajectory`] |
//! | [`time_index`] | Offset to slot, forecast hour and label |
//! | [`WeatherCache`] | One forecast per trajectory sample, cached per key |
//! | [`SelectionController`] | Selection state, pan side effect, hour readout |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use skyfleet_core::{
//!     FeedEndpoints, HttpFeedClient, SelectionController, SnapshotIngestor, SystemClock,
//!     WeatherCache,
//! };
//! use skyfleet_core::mock::RecordingMapView;
//! use skyfleet_types::ObjectKey;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(HttpFeedClient::new(FeedEndpoints::default())?);
//!
//!     let report = SnapshotIngestor::new(client.clone()).ingest_all().await;
//!     println!("{} of 24 hours loaded", report.loaded());
//!
//!     let mut controller = SelectionController::new(
//!         Arc::new(report.into_store()),
//!         Arc::new(WeatherCache::new(client)),
//!         Arc::new(RecordingMapView::new()),
//!         Arc::new(SystemClock::utc()),
//!     );
//!
//!     controller.select_balloon(ObjectKey::new(0))?.await?;
//!     controller.set_offset(-6)?;
//!     println!("{:?}", controller.readout().await);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod ingest;
pub mod mock;
pub mod retry;
pub mod selection;
pub mod time_index;
pub mod traits;
pub mod trajectory;
pub mod weather;

// Core exports
pub use client::{FeedEndpoints, HttpFeedClient};
pub use config::{Config, ConfigError, ValidationError, default_config_path};
pub use error::{Error, FetchFailureReason, Result};
pub use ingest::{HourOutcome, IngestOptions, IngestReport, SnapshotIngestor, SnapshotOutcome};
pub use retry::{RetryConfig, with_retry};
pub use selection::{HourReadout, Selection, SelectionController, WeatherReadout};
pub use time_index::{HourOffset, SystemClock, local_timezone};
pub use traits::{Clock, ForecastSource, MapView, SnapshotSource};
pub use trajectory::{Trajectory, TrajectoryStore};
pub use weather::{ForecastOptions, ForecastQuery, WeatherCache, WeatherSample, WeatherSeries};

pub use mock::{FixedClock, MockFeed, MockFeedBuilder, RecordingMapView};

// Re-export from skyfleet-types
pub use skyfleet_types::{
    ForecastPayload, HourlyConditions, ObjectKey, ParseError, Position, Snapshot,
};

