//! Per-object forecast fetching and memoization.
//!
//! Selecting an object fans out one forecast request per recorded trajectory
//! sample. The settled batch is published as a [`WeatherSeries`] and cached
//! for the rest of the session.
//!
//! # Memoization
//!
//! Each key owns a [`OnceCell`]. Membership is checked and the cell inserted
//! under a single lock acquisition, so two selections racing for the same key
//! share one batch: the first caller runs it, later callers wait on the cell
//! and receive the same series. Nothing is visible to readers until the whole
//! batch has settled.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use time::UtcOffset;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use skyfleet_types::{ForecastPayload, HourlyConditions, ObjectKey, Position};

use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::time_index::{HourOffset, local_timezone, to_array_index, weather_hour_index};
use crate::traits::ForecastSource;
use crate::trajectory::Trajectory;

/// Hourly fields requested for every position.
pub const HOURLY_FIELDS: [&str; 3] = ["temperature_2m", "precipitation", "wind_speed_10m"];

/// Request options shared by every forecast query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastOptions {
    /// IANA timezone the hourly window is expressed in.
    pub timezone: String,
}

impl Default for ForecastOptions {
    /// Options in the machine's own timezone.
    fn default() -> Self {
        Self {
            timezone: local_timezone(),
        }
    }
}

impl ForecastOptions {
    /// Options for the given timezone.
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
        }
    }
}

/// One forecast request: a position plus the fixed option set.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
}

impl ForecastQuery {
    /// Query for `position` with the shared options.
    pub fn new(position: &Position, options: &ForecastOptions) -> Self {
        Self {
            latitude: position.lat,
            longitude: position.lng,
            timezone: options.timezone.clone(),
        }
    }

    /// Query-string parameters, in request order.
    ///
    /// ```
    /// use skyfleet_core::weather::{ForecastOptions, ForecastQuery};
    /// use skyfleet_types::Position;
    ///
    /// let query = ForecastQuery::new(&Position::new(10.0, 20.0), &ForecastOptions::default());
    /// let params = query.params();
    /// assert!(params.contains(&("past_days", "1".to_string())));
    /// assert!(params.contains(&("wind_speed_unit", "mph".to_string())));
    /// ```
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("hourly", HOURLY_FIELDS.join(",")),
            ("timezone", self.timezone.clone()),
            ("past_days", "1".to_string()),
            ("forecast_days", "1".to_string()),
            ("wind_speed_unit", "mph".to_string()),
            ("temperature_unit", "fahrenheit".to_string()),
            ("precipitation_unit", "inch".to_string()),
        ]
    }
}

/// A forecast tagged with the trajectory slot it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSample {
    /// Trajectory slot (0 = current hour).
    pub index: usize,
    pub payload: ForecastPayload,
}

/// Settled forecasts for one object, most recent slot first.
///
/// Failed requests are dropped, so the series may hold fewer entries than the
/// trajectory it was built from. Each entry keeps its trajectory slot, and
/// lookups go through that slot rather than through the entry's position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSeries {
    samples: Vec<WeatherSample>,
    span: usize,
}

impl WeatherSeries {
    /// Build a series covering `span` trajectory slots.
    ///
    /// Samples are sorted by slot.
    pub fn new(mut samples: Vec<WeatherSample>, span: usize) -> Self {
        samples.sort_by_key(|s| s.index);
        Self { samples, span }
    }

    /// Number of forecasts that arrived.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether every request failed (or the trajectory was empty).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the trajectory the series was requested for.
    pub fn span(&self) -> usize {
        self.span
    }

    /// The settled samples in slot order.
    pub fn samples(&self) -> &[WeatherSample] {
        &self.samples
    }

    /// Payloads in slot order.
    pub fn payloads(&self) -> impl Iterator<Item = &ForecastPayload> {
        self.samples.iter().map(|s| &s.payload)
    }

    /// The forecast requested for trajectory slot `index`.
    ///
    /// Fails with [`Error::IndexOutOfRange`] beyond the trajectory length and
    /// with [`Error::MissingSample`] when that slot's request failed.
    pub fn at(&self, index: usize) -> Result<&ForecastPayload> {
        if index >= self.span {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.span,
            });
        }
        self.samples
            .binary_search_by_key(&index, |s| s.index)
            .map(|i| &self.samples[i].payload)
            .map_err(|_| Error::MissingSample { index })
    }

    /// UTC offset the forecasts' hourly windows are expressed in.
    ///
    /// `None` when no forecast arrived or the feed did not report one.
    pub fn utc_offset(&self) -> Option<UtcOffset> {
        self.payloads()
            .find_map(|p| p.utc_offset_seconds)
            .and_then(|secs| UtcOffset::from_whole_seconds(secs).ok())
    }

    /// Conditions shown for `offset` when the current hour is `current_hour`.
    ///
    /// The offset picks the trajectory slot and, independently, the hour
    /// within that slot's forecast window.
    pub fn conditions_for(&self, offset: HourOffset, current_hour: u8) -> Result<HourlyConditions> {
        let payload = self.at(to_array_index(offset))?;
        let hour_index = weather_hour_index(offset, current_hour);
        payload
            .conditions_at(hour_index)
            .ok_or(Error::IndexOutOfRange {
                index: hour_index,
                len: payload.hours(),
            })
    }
}

type Slot = Arc<OnceCell<Arc<WeatherSeries>>>;

/// Session-scoped forecast cache keyed by object.
///
/// Entries are never evicted or overwritten.
pub struct WeatherCache {
    source: Arc<dyn ForecastSource>,
    options: ForecastOptions,
    retry: RetryConfig,
    entries: Mutex<HashMap<ObjectKey, Slot>>,
}

impl WeatherCache {
    /// Create a cache with the default options and forecast retry preset.
    pub fn new(source: Arc<dyn ForecastSource>) -> Self {
        Self::with_options(source, ForecastOptions::default())
    }

    /// Create a cache with custom request options.
    pub fn with_options(source: Arc<dyn ForecastSource>, options: ForecastOptions) -> Self {
        Self {
            source,
            options,
            retry: RetryConfig::for_forecast(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Set the retry policy applied to each forecast request.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The request options.
    pub fn options(&self) -> &ForecastOptions {
        &self.options
    }

    /// Weather for `key`, fetching it on first use.
    ///
    /// A cached key returns immediately without issuing requests. While a
    /// batch is in flight, further calls for the same key wait for it instead
    /// of starting their own; their `trajectory` argument is ignored.
    pub async fn fetch_for(&self, key: ObjectKey, trajectory: &Trajectory) -> Arc<WeatherSeries> {
        let slot = {
            let mut entries = self.entries.lock().await;
            Arc::clone(entries.entry(key).or_default())
        };

        if let Some(series) = slot.get() {
            debug!("Weather cache hit for {}", key);
            return Arc::clone(series);
        }

        let series = slot
            .get_or_init(|| async { Arc::new(self.fetch_series(key, trajectory).await) })
            .await;
        Arc::clone(series)
    }

    async fn fetch_series(&self, key: ObjectKey, trajectory: &Trajectory) -> WeatherSeries {
        let requests = trajectory.samples().map(|(index, position)| {
            let query = ForecastQuery::new(&position, &self.options);
            async move {
                let name = format!("Forecast for {} slot {}", key, index);
                match with_retry(&self.retry, &name, || self.source.fetch_forecast(&query)).await {
                    Ok(payload) => Some(WeatherSample { index, payload }),
                    Err(e) => {
                        warn!("{} skipped: {}", name, e);
                        None
                    }
                }
            }
        });

        let samples: Vec<WeatherSample> = join_all(requests).await.into_iter().flatten().collect();
        let requested = trajectory.recorded();

        if samples.is_empty() && requested > 0 {
            warn!("All {} forecast requests for {} failed", requested, key);
        } else {
            info!(
                "Fetched {}/{} forecasts for {}",
                samples.len(),
                requested,
                key
            );
        }

        WeatherSeries::new(samples, trajectory.len())
    }

    /// The settled series for `key`, if its batch has completed.
    pub async fn cached(&self, key: ObjectKey) -> Option<Arc<WeatherSeries>> {
        let entries = self.entries.lock().await;
        entries.get(&key).and_then(|slot| slot.get().cloned())
    }

    /// Whether a batch for `key` has started but not settled.
    pub async fn is_pending(&self, key: ObjectKey) -> bool {
        let entries = self.entries.lock().await;
        entries.get(&key).is_some_and(|slot| !slot.initialized())
    }

    /// Number of keys with a settled series.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.values().filter(|slot| slot.initialized()).count()
    }

    /// Whether no series has settled yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCache")
            .field("options", &self.options)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
