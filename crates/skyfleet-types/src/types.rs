//! Core types for fleet snapshots and forecast payloads.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Identity of a tracked object.
///
/// Snapshots carry no object identifier of their own: an object's key is its
/// position within the snapshot array. Keys are only stable while every
/// snapshot enumerates the same objects in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Create a key from a position within a snapshot array.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The position within the snapshot array this key stands for.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for ObjectKey {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reported position of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees, -90 to 90.
    pub lat: f64,
    /// Longitude in degrees, -180 to 180.
    pub lng: f64,
    /// Altitude in kilometres, when the feed reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

impl Position {
    /// Create a position without altitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            alt: None,
        }
    }

    /// Create a position with altitude.
    #[must_use]
    pub const fn with_alt(lat: f64, lng: f64, alt: f64) -> Self {
        Self {
            lat,
            lng,
            alt: Some(alt),
        }
    }

    /// Build a position from a feed record `[lat, lng, alt?, ...]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use skyfleet_types::Position;
    ///
    /// let p = Position::from_record(&[47.5, -122.3, 14.2]).unwrap();
    /// assert_eq!(p.alt, Some(14.2));
    /// assert!(Position::from_record(&[47.5]).is_err());
    /// assert!(Position::from_record(&[91.0, 0.0]).is_err());
    /// ```
    pub fn from_record(record: &[f64]) -> ParseResult<Self> {
        let (lat, lng) = match record {
            [lat, lng, ..] => (*lat, *lng),
            _ => {
                return Err(ParseError::invalid(format!(
                    "expected at least [lat, lng], got {} value(s)",
                    record.len()
                )));
            }
        };

        if !(-90.0..=90.0).contains(&lat) {
            return Err(ParseError::invalid(format!("latitude {lat} out of range")));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ParseError::invalid(format!("longitude {lng} out of range")));
        }

        Ok(Self {
            lat,
            lng,
            alt: record.get(2).copied(),
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)?;
        if let Some(alt) = self.alt {
            write!(f, " @ {:.2} km", alt)?;
        }
        Ok(())
    }
}

/// One hourly snapshot of the whole fleet.
///
/// Element `i` of `positions` belongs to [`ObjectKey::new(i)`](ObjectKey::new).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Positions in feed order.
    pub positions: Vec<Position>,
}

impl Snapshot {
    /// Parse a snapshot body: a JSON array of `[lat, lng, alt?]` records.
    ///
    /// A single unusable record rejects the whole snapshot, because skipping
    /// it would shift the positional key of every record after it.
    pub fn from_json(bytes: &[u8]) -> ParseResult<Self> {
        let records: Vec<Vec<f64>> = serde_json::from_slice(bytes)?;
        let positions = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                Position::from_record(record)
                    .map_err(|e| ParseError::invalid(format!("record {}: {}", i, e)))
            })
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(Self { positions })
    }

    /// Number of objects in the snapshot.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the snapshot lists no objects.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterate `(key, position)` pairs in feed order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &Position)> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, p)| (ObjectKey::new(i), p))
    }
}

/// Hourly forecast arrays, indexed by hour-of-window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    /// Local timestamps (`YYYY-MM-DDTHH:MM`) for each hour.
    #[serde(default)]
    pub time: Vec<String>,
    /// Air temperature at 2 m.
    pub temperature_2m: Vec<Option<f64>>,
    /// Precipitation for the preceding hour.
    pub precipitation: Vec<Option<f64>>,
    /// Wind speed at 10 m.
    pub wind_speed_10m: Vec<Option<f64>>,
}

/// Units reported alongside the hourly arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyUnits {
    #[serde(default)]
    pub temperature_2m: Option<String>,
    #[serde(default)]
    pub precipitation: Option<String>,
    #[serde(default)]
    pub wind_speed_10m: Option<String>,
}

/// A forecast response for one position.
///
/// The window runs from one day before "now" through one day after, so index
/// `24 + current_hour` is the current hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Offset of `timezone` from UTC at request time. The hourly window is
    /// expressed in this offset.
    #[serde(default)]
    pub utc_offset_seconds: Option<i32>,
    pub hourly: HourlySeries,
    #[serde(default)]
    pub hourly_units: Option<HourlyUnits>,
}

impl ForecastPayload {
    /// Parse and validate a forecast body.
    pub fn from_json(bytes: &[u8]) -> ParseResult<Self> {
        let payload: Self = serde_json::from_slice(bytes)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Check that the hourly arrays have equal lengths.
    pub fn validate(&self) -> ParseResult<()> {
        let hourly = &self.hourly;
        let expected = hourly.temperature_2m.len();
        let lengths = [
            ("precipitation", hourly.precipitation.len()),
            ("wind_speed_10m", hourly.wind_speed_10m.len()),
        ];
        for (field, actual) in lengths {
            if actual != expected {
                return Err(ParseError::LengthMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        // `time` is optional, but when present it must line up too
        if !hourly.time.is_empty() && hourly.time.len() != expected {
            return Err(ParseError::LengthMismatch {
                field: "time",
                expected,
                actual: hourly.time.len(),
            });
        }
        Ok(())
    }

    /// Number of hours in the forecast window.
    pub fn hours(&self) -> usize {
        self.hourly.temperature_2m.len()
    }

    /// Conditions for one hour-of-window slot, or `None` past the window.
    pub fn conditions_at(&self, hour_index: usize) -> Option<HourlyConditions> {
        if hour_index >= self.hours() {
            return None;
        }
        let hourly = &self.hourly;
        Some(HourlyConditions {
            time: hourly.time.get(hour_index).cloned(),
            temperature: hourly.temperature_2m[hour_index],
            precipitation: hourly.precipitation[hour_index],
            wind_speed: hourly.wind_speed_10m[hour_index],
        })
    }
}

/// Weather values for a single hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyConditions {
    /// Local timestamp of the hour, if the feed supplied one.
    pub time: Option<String>,
    /// Temperature (°F with the default request options).
    pub temperature: Option<f64>,
    /// Precipitation (inches with the default request options).
    pub precipitation: Option<f64>,
    /// Wind speed (mph with the default request options).
    pub wind_speed: Option<f64>,
}
