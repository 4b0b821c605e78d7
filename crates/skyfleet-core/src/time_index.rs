//! Mapping between the relative-hour slider and series indices.
//!
//! One [`HourOffset`] drives three lookups that must stay consistent:
//!
//! | Lookup | Function | Offset 0 | Offset -23 |
//! |--------|----------|----------|------------|
//! | Trajectory / weather series slot | [`to_array_index`] | 0 | 23 |
//! | Forecast hour-of-window | [`weather_hour_index`] | `24 + h` | `1 + h` |
//! | Slider label | [`slider_label`] | `h:00` | `(h - 23) mod 24:00` |
//!
//! where `h` is the current hour. Series are 0-aligned to "now", so the slot
//! index is the offset with its sign flipped; it is never an end-relative index.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::Clock;

/// Furthest the slider reaches into the past.
pub const MAX_LOOKBACK_HOURS: i32 = 23;

/// Offsets that carry a label under the slider.
pub const SLIDER_MARKS: [i32; 7] = [-23, -20, -16, -12, -8, -4, 0];

/// Hours in the forecast window before "today" (`past_days=1`).
const PAST_WINDOW_HOURS: usize = 24;

/// A relative hour offset in `[-23, 0]`; 0 is the current hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct HourOffset(i8);

impl HourOffset {
    /// The current hour.
    pub const NOW: Self = Self(0);

    /// Validate an offset from the slider.
    pub fn new(offset: i32) -> Result<Self> {
        if (-MAX_LOOKBACK_HOURS..=0).contains(&offset) {
            Ok(Self(offset as i8))
        } else {
            Err(Error::InvalidOffset(offset))
        }
    }

    /// The raw offset value.
    pub fn get(self) -> i32 {
        i32::from(self.0)
    }

    /// All offsets from now back to the edge of the window.
    pub fn all() -> impl Iterator<Item = Self> {
        (-MAX_LOOKBACK_HOURS..=0).rev().map(|o| Self(o as i8))
    }
}

impl TryFrom<i32> for HourOffset {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<HourOffset> for i32 {
    fn from(offset: HourOffset) -> Self {
        offset.get()
    }
}

impl fmt::Display for HourOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            write!(f, "now")
        } else {
            write!(f, "{}h", self.0)
        }
    }
}

/// Slot index into a trajectory or weather series: 0 at "now", growing into the past.
pub fn to_array_index(offset: HourOffset) -> usize {
    (-offset.get()) as usize
}

/// `HH:00` label for an absolute hour, wrapping modulo 24.
///
/// # Examples
///
/// ```
/// use skyfleet_core::time_index::format_label;
///
/// assert_eq!(format_label(7), "07:00");
/// assert_eq!(format_label(-1), "23:00");
/// assert_eq!(format_label(24), "00:00");
/// ```
pub fn format_label(hour: i32) -> String {
    format!("{:02}:00", hour.rem_euclid(24))
}

/// Index into a forecast's hourly arrays for the hour selected by `offset`.
///
/// The window starts one day before today, so the current hour lives at
/// `24 + current_hour`.
pub fn weather_hour_index(offset: HourOffset, current_hour: u8) -> usize {
    let index = PAST_WINDOW_HOURS as i32 + i32::from(current_hour) + offset.get();
    // current_hour >= 0 and offset >= -23 keep this positive
    index as usize
}

/// Label shown beside the slider for `offset`.
pub fn slider_label(offset: HourOffset, current_hour: u8) -> String {
    format_label(i32::from(current_hour) + offset.get())
}

/// Labelled slider marks for the current hour, oldest first.
pub fn slider_marks(current_hour: u8) -> Vec<(HourOffset, String)> {
    SLIDER_MARKS
        .iter()
        .map(|&o| {
            let offset = HourOffset(o as i8);
            (offset, slider_label(offset, current_hour))
        })
        .collect()
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Clock reading UTC hours.
    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
        }
    }

    /// Clock reading hours at the local UTC offset.
    ///
    /// Falls back to UTC when the platform cannot report the local offset.
    pub fn local() -> Self {
        match UtcOffset::current_local_offset() {
            Ok(offset) => Self { offset },
            Err(e) => {
                warn!("Local UTC offset unavailable ({}), using UTC", e);
                Self::utc()
            }
        }
    }

    /// Clock matching a forecast timezone setting.
    ///
    /// `UTC` and `GMT` read UTC and the machine's own zone reads the local
    /// offset. Other zones cannot be resolved without a timezone database,
    /// so the clock reads UTC; readouts switch to the forecast's reported
    /// offset as soon as forecasts arrive.
    pub fn for_timezone(timezone: &str) -> Self {
        if timezone.eq_ignore_ascii_case("utc") || timezone.eq_ignore_ascii_case("gmt") {
            Self::utc()
        } else if timezone == local_timezone() {
            Self::local()
        } else {
            warn!(
                "Timezone {} differs from the local zone; hours read in UTC until forecasts report their offset",
                timezone
            );
            Self::utc()
        }
    }

    /// The UTC offset this clock reads at.
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Clock for SystemClock {
    fn current_hour(&self) -> u8 {
        self.hour_at(self.offset)
    }

    fn hour_at(&self, offset: UtcOffset) -> u8 {
        OffsetDateTime::now_utc().to_offset(offset).hour()
    }
}

/// The machine's IANA timezone name, or `UTC` when it cannot be determined.
pub fn local_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|e| {
        debug!("Local timezone unavailable ({}), using UTC", e);
        "UTC".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_array_index_bounds() {
        assert_eq!(to_array_index(HourOffset::new(0).unwrap()), 0);
        assert_eq!(to_array_index(HourOffset::new(-23).unwrap()), 23);
        assert_eq!(to_array_index(HourOffset::new(-5).unwrap()), 5);
    }

    #[test]
    fn test_hour_offset_validation() {
        assert!(HourOffset::new(1).is_err());
        assert!(HourOffset::new(-24).is_err());
        assert!(matches!(HourOffset::new(-24), Err(Error::InvalidOffset(-24))));
        assert_eq!(HourOffset::default(), HourOffset::NOW);
    }

    #[test]
    fn test_hour_offset_all() {
        let all: Vec<i32> = HourOffset::all().map(HourOffset::get).collect();
        assert_eq!(all.len(), 24);
        assert_eq!(all.first(), Some(&0));
        assert_eq!(all.last(), Some(&-23));
    }

    #[test]
    fn test_hour_offset_serde() {
        let offset: HourOffset = serde_json::from_str("-4").unwrap();
        assert_eq!(offset.get(), -4);
        assert_eq!(serde_json::to_string(&offset).unwrap(), "-4");
        assert!(serde_json::from_str::<HourOffset>("3").is_err());
    }

    #[test]
    fn test_format_label_examples() {
        assert_eq!(format_label(0), "00:00");
        assert_eq!(format_label(9), "09:00");
        assert_eq!(format_label(23), "23:00");
        assert_eq!(format_label(-1), "23:00");
        assert_eq!(format_label(-14), "10:00");
        assert_eq!(format_label(-15), "09:00");
        assert_eq!(format_label(24), "00:00");
        assert_eq!(format_label(47), "23:00");
    }

    #[test]
    fn test_weather_hour_index() {
        assert_eq!(weather_hour_index(HourOffset::NOW, 0), 24);
        assert_eq!(weather_hour_index(HourOffset::NOW, 13), 37);
        assert_eq!(weather_hour_index(HourOffset::new(-23).unwrap(), 0), 1);
        assert_eq!(weather_hour_index(HourOffset::new(-3).unwrap(), 10), 31);
    }

    #[test]
    fn test_slider_marks() {
        let marks = slider_marks(5);
        let labels: Vec<&str> = marks.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec!["06:00", "09:00", "13:00", "17:00", "21:00", "01:00", "05:00"]
        );
        assert_eq!(marks[0].0.get(), -23);
        assert_eq!(marks[6].0, HourOffset::NOW);
    }

    #[test]
    fn test_system_clock_for_timezone() {
        assert_eq!(SystemClock::for_timezone("UTC").offset(), UtcOffset::UTC);
        assert_eq!(SystemClock::for_timezone("gmt").offset(), UtcOffset::UTC);
        assert!(SystemClock::utc().current_hour() < 24);
    }

    #[test]
    fn test_system_clock_hour_at_other_offset() {
        let clock = SystemClock::utc();
        let tokyo = UtcOffset::from_hms(9, 0, 0).unwrap();
        let before = OffsetDateTime::now_utc();
        let hour = clock.hour_at(tokyo);
        let after = OffsetDateTime::now_utc();

        // tolerate the hour rolling over between the two reads
        let candidates = [before, after].map(|t| t.to_offset(tokyo).hour());
        assert!(candidates.contains(&hour));
    }

    #[test]
    fn test_local_timezone_is_named() {
        assert!(!local_timezone().is_empty());
    }

    proptest! {
        #[test]
        fn format_label_always_wraps_into_day(hour in any::<i32>()) {
            let label = format_label(hour);
            prop_assert_eq!(label.len(), 5);
            prop_assert!(label.ends_with(":00"));
            let hh: i32 = label[..2].parse().unwrap();
            prop_assert!((0..24).contains(&hh));
            prop_assert_eq!((hh - hour).rem_euclid(24), 0);
        }

        #[test]
        fn offset_drives_consistent_indices(offset in -23i32..=0, current_hour in 0u8..24) {
            let offset = HourOffset::new(offset).unwrap();
            let slot = to_array_index(offset);
            let window = weather_hour_index(offset, current_hour);
            prop_assert!(slot <= 23);
            // the forecast slot sits `slot` hours before the current-hour slot
            prop_assert_eq!(window + slot, 24 + usize::from(current_hour));
            prop_assert_eq!(
                slider_label(offset, current_hour),
                format_label(i32::from(current_hour) - slot as i32)
            );
        }
    }
}
