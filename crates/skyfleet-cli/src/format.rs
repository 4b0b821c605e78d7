//! Output formatting utilities for text and JSON output.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use skyfleet_core::{HourOffset, HourOutcome, HourReadout, IngestReport, SnapshotOutcome, WeatherReadout};
use skyfleet_types::{HourlyConditions, ObjectKey, Position};
use time::format_description::well_known::Rfc3339;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool, compact: bool) -> Self {
        Self { no_color, compact }
    }

    /// Serialize `value` as JSON, honouring `compact`.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

// ============================================================================
// Shared pieces
// ============================================================================

/// Short status tag for a snapshot hour.
#[must_use]
pub fn format_outcome(outcome: &SnapshotOutcome, no_color: bool) -> String {
    let label = match outcome {
        SnapshotOutcome::Loaded { .. } => "[OK]",
        SnapshotOutcome::Failed { .. } => "[FAILED]",
        SnapshotOutcome::Misaligned { .. } => "[MISALIGNED]",
    };
    if no_color {
        return label.to_string();
    }
    match outcome {
        SnapshotOutcome::Loaded { .. } => label.green().to_string(),
        SnapshotOutcome::Failed { .. } => label.red().to_string(),
        SnapshotOutcome::Misaligned { .. } => label.yellow().to_string(),
    }
}

fn format_optional(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.*} {}", precision, v, unit),
        None => "--".to_string(),
    }
}

/// One-line weather summary: temperature, precipitation, wind.
#[must_use]
pub fn format_conditions(conditions: &HourlyConditions) -> String {
    format!(
        "{}, {}, wind {}",
        format_optional(conditions.temperature, 1, "°F"),
        format_optional(conditions.precipitation, 2, "in"),
        format_optional(conditions.wind_speed, 1, "mph"),
    )
}

/// Weather column text for a readout.
#[must_use]
pub fn format_weather(weather: &WeatherReadout) -> String {
    match weather {
        WeatherReadout::Loading => "loading...".to_string(),
        WeatherReadout::Unavailable => "no data for this hour".to_string(),
        WeatherReadout::Conditions(c) => format_conditions(c),
    }
}

fn format_position(position: Option<&Position>) -> String {
    position.map_or_else(|| "no data for this hour".to_string(), Position::to_string)
}

// ============================================================================
// Fleet formatting
// ============================================================================

fn latest(report: &IngestReport, limit: usize) -> Vec<(ObjectKey, Position)> {
    let positions = report.store.latest_positions();
    if limit == 0 {
        positions
    } else {
        positions.into_iter().take(limit).collect()
    }
}

#[must_use]
pub fn format_fleet_text(report: &IngestReport, limit: usize, opts: &FormatOptions) -> String {
    let mut output = format!(
        "Snapshots: {}/{} loaded\n",
        report.loaded(),
        report.outcomes.len()
    );
    for HourOutcome { hour, outcome } in &report.outcomes {
        let detail = match outcome {
            SnapshotOutcome::Loaded { objects } => format!("{} objects", objects),
            SnapshotOutcome::Failed { reason } => reason.clone(),
            SnapshotOutcome::Misaligned { objects, expected } => {
                format!("{} objects, expected {}", objects, expected)
            }
        };
        output.push_str(&format!(
            "  {:02}.json {} {}\n",
            hour,
            format_outcome(outcome, opts.no_color),
            detail
        ));
    }

    if report.store.is_empty() {
        output.push_str("\nNo objects tracked.\n");
        return output;
    }

    let shown = latest(report, limit);
    output.push_str(&format!("\nObjects ({}):\n", report.store.len()));
    for (key, position) in &shown {
        output.push_str(&format!("  {:>6}  {}\n", key.to_string(), position));
    }
    if shown.len() < report.store.len() {
        output.push_str(&format!(
            "  ... and {} more objects\n",
            report.store.len() - shown.len()
        ));
    }
    output
}

/// Format the fleet as JSON.
pub fn format_fleet_json(report: &IngestReport, limit: usize, opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct ObjectJson {
        key: ObjectKey,
        position: Position,
    }

    #[derive(Serialize)]
    struct FleetJson<'a> {
        fetched_at: String,
        loaded: usize,
        objects_tracked: usize,
        snapshots: &'a [HourOutcome],
        objects: Vec<ObjectJson>,
    }

    let fleet = FleetJson {
        fetched_at: report.fetched_at.format(&Rfc3339).unwrap_or_default(),
        loaded: report.loaded(),
        objects_tracked: report.store.len(),
        snapshots: &report.outcomes,
        objects: latest(report, limit)
            .into_iter()
            .map(|(key, position)| ObjectJson { key, position })
            .collect(),
    };
    opts.as_json(&fleet)
}

// ============================================================================
// Track formatting
// ============================================================================

#[must_use]
pub fn format_readout_text(readout: &HourReadout) -> String {
    format!(
        "{} ({})\n  Position: {}\n  Weather:  {}\n",
        readout.label,
        readout.offset,
        format_position(readout.position.as_ref()),
        format_weather(&readout.weather)
    )
}

#[must_use]
pub fn format_track_text(
    readout: &HourReadout,
    centre: Option<Position>,
    marks: &[(HourOffset, String)],
    opts: &FormatOptions,
) -> String {
    let title = format!("Object {}", readout.key);
    let mut output = if opts.no_color {
        format!("{}\n", title)
    } else {
        format!("{}\n", title.bold())
    };
    if let Some(centre) = centre {
        output.push_str(&format!("Map centred on {}\n", centre));
    }
    let marks: Vec<String> = marks
        .iter()
        .map(|(offset, label)| format!("{}={}", offset.get(), label))
        .collect();
    output.push_str(&format!("Slider: {}\n\n", marks.join("  ")));
    output.push_str(&format_readout_text(readout));
    output
}

/// Format a track result as JSON.
pub fn format_track_json(
    readout: &HourReadout,
    centre: Option<Position>,
    marks: &[(HourOffset, String)],
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct MarkJson<'a> {
        offset: HourOffset,
        label: &'a str,
    }

    #[derive(Serialize)]
    struct TrackJson<'a> {
        centre: Option<Position>,
        slider: Vec<MarkJson<'a>>,
        readout: &'a HourReadout,
    }

    let track = TrackJson {
        centre,
        slider: marks
            .iter()
            .map(|(offset, label)| MarkJson {
                offset: *offset,
                label,
            })
            .collect(),
        readout,
    };
    opts.as_json(&track)
}

// ============================================================================
// Timeline formatting
// ============================================================================

#[must_use]
pub fn format_timeline_text(key: ObjectKey, readouts: &[HourReadout]) -> String {
    let mut output = format!("Object {} over the last {} hours:\n\n", key, readouts.len());
    for readout in readouts {
        output.push_str(&format!(
            "  {} {:>4}  {:<32} {}\n",
            readout.label,
            readout.offset.get(),
            format_position(readout.position.as_ref()),
            format_weather(&readout.weather)
        ));
    }
    output
}

/// Format a timeline as JSON.
pub fn format_timeline_json(readouts: &[HourReadout], opts: &FormatOptions) -> Result<String> {
    opts.as_json(&readouts)
}
