//! Selection state and the per-hour readout.
//!
//! [`SelectionController`] owns which object is selected and which relative
//! hour is displayed. Selecting an object recentres the map and starts its
//! weather batch in the background; the readout reports "loading" until that
//! batch settles.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use skyfleet_types::{HourlyConditions, ObjectKey, Position};

use crate::error::{Error, Result};
use crate::time_index::{HourOffset, slider_label, slider_marks, to_array_index};
use crate::traits::{Clock, MapView};
use crate::trajectory::TrajectoryStore;
use crate::weather::{WeatherCache, WeatherSeries};

/// Which object, if any, is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "key", rename_all = "snake_case")]
pub enum Selection {
    /// Initial state; never re-entered.
    #[default]
    None,
    Selected(ObjectKey),
}

impl Selection {
    /// The selected key, if any.
    pub fn key(&self) -> Option<ObjectKey> {
        match self {
            Self::None => None,
            Self::Selected(key) => Some(*key),
        }
    }
}

/// Weather state for the displayed hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "conditions", rename_all = "snake_case")]
pub enum WeatherReadout {
    /// The batch for this object has not settled.
    Loading,
    /// No forecast covers this hour (request failed or slot never recorded).
    Unavailable,
    Conditions(HourlyConditions),
}

/// Everything the display needs for the selected object and hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourReadout {
    pub key: ObjectKey,
    pub offset: HourOffset,
    /// `HH:00` label for the displayed hour.
    pub label: String,
    /// Trajectory position, or `None` for "no data for this hour".
    pub position: Option<Position>,
    pub weather: WeatherReadout,
}

/// Owns the selected object and the displayed hour offset.
pub struct SelectionController {
    store: Arc<TrajectoryStore>,
    weather: Arc<WeatherCache>,
    map: Arc<dyn MapView>,
    clock: Arc<dyn Clock>,
    selection: Selection,
    offset: HourOffset,
}

impl SelectionController {
    /// Create a controller with nothing selected, showing the current hour.
    pub fn new(
        store: Arc<TrajectoryStore>,
        weather: Arc<WeatherCache>,
        map: Arc<dyn MapView>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            weather,
            map,
            clock,
            selection: Selection::None,
            offset: HourOffset::NOW,
        }
    }

    /// Select `key`.
    ///
    /// Pans the map to the object's most recent position and starts its
    /// weather batch on the runtime. The returned handle may be awaited or
    /// dropped; the controller never waits on it. Re-selecting the same key
    /// repeats both side effects, and the cache turns the second fetch into a
    /// lookup.
    ///
    /// The most recent position is slot 0. When hour 00 was not ingested the
    /// pan falls back to the lowest populated slot, the freshest position
    /// that exists.
    ///
    /// Keys that appear in no snapshot are rejected with
    /// [`Error::UnknownKey`] and leave the state unchanged.
    ///
    /// Must be called from within a tokio runtime.
    pub fn select_balloon(&mut self, key: ObjectKey) -> Result<JoinHandle<Arc<WeatherSeries>>> {
        let (_, latest) = self
            .store
            .get(key)
            .and_then(|t| t.latest())
            .ok_or(Error::UnknownKey(key))?;

        self.selection = Selection::Selected(key);
        info!("Selected {} at {}", key, latest);
        self.map.pan_to(latest);

        let store = Arc::clone(&self.store);
        let weather = Arc::clone(&self.weather);
        Ok(tokio::spawn(async move {
            match store.get(key) {
                Some(trajectory) => weather.fetch_for(key, trajectory).await,
                None => Arc::new(WeatherSeries::default()),
            }
        }))
    }

    /// Display the hour `offset` hours from now.
    pub fn set_offset(&mut self, offset: i32) -> Result<()> {
        self.offset = HourOffset::new(offset)?;
        debug!("Offset set to {}", self.offset);
        Ok(())
    }

    /// The displayed hour offset.
    pub fn offset(&self) -> HourOffset {
        self.offset
    }

    /// The current selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The trajectory store being browsed.
    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    /// Label for the displayed hour.
    pub async fn label(&self) -> String {
        let series = self.selected_series().await;
        slider_label(self.offset, self.anchor_hour(series.as_deref()))
    }

    /// Labelled slider marks for the current hour.
    pub async fn slider_marks(&self) -> Vec<(HourOffset, String)> {
        let series = self.selected_series().await;
        slider_marks(self.anchor_hour(series.as_deref()))
    }

    async fn selected_series(&self) -> Option<Arc<WeatherSeries>> {
        let key = self.selection.key()?;
        self.weather.cached(key).await
    }

    /// Current hour that offset 0 stands for.
    ///
    /// Once forecasts report their UTC offset the hour is read at that
    /// offset, so labels and forecast window slots name the same hour even
    /// when the clock runs in another zone.
    fn anchor_hour(&self, series: Option<&WeatherSeries>) -> u8 {
        match series.and_then(WeatherSeries::utc_offset) {
            Some(offset) => self.clock.hour_at(offset),
            None => self.clock.current_hour(),
        }
    }

    /// The readout for the selected object at the displayed hour.
    ///
    /// `None` while nothing is selected. Short series render as "no data"
    /// rather than failing.
    pub async fn readout(&self) -> Option<HourReadout> {
        let key = self.selection.key()?;
        Some(self.readout_at(key, self.offset).await)
    }

    /// The readout for `key` at `offset`, independent of the current state.
    pub async fn readout_at(&self, key: ObjectKey, offset: HourOffset) -> HourReadout {
        let series = self.weather.cached(key).await;
        let current_hour = self.anchor_hour(series.as_deref());
        let slot = to_array_index(offset);

        let position = match self.store.position_at(key, slot) {
            Ok(position) => Some(position),
            Err(e) => {
                debug!("No position for {} at {}: {}", key, offset, e);
                None
            }
        };

        let weather = match series {
            None => WeatherReadout::Loading,
            Some(series) => match series.conditions_for(offset, current_hour) {
                Ok(conditions) => WeatherReadout::Conditions(conditions),
                Err(e) => {
                    debug!("No weather for {} at {}: {}", key, offset, e);
                    WeatherReadout::Unavailable
                }
            },
        };

        HourReadout {
            key,
            offset,
            label: slider_label(offset, current_hour),
            position,
            weather,
        }
    }
}

impl std::fmt::Debug for SelectionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionController")
            .field("selection", &self.selection)
            .field("offset", &self.offset)
            .field("objects", &self.store.len())
            .finish_non_exhaustive()
    }
}
