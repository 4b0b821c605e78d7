//! Track command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use skyfleet_core::{Config, ObjectKey};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_track_json, format_track_text};
use crate::util::{TerminalMapView, build_client, controller, ingest, write_output};

/// Arguments for the track command.
pub struct TrackArgs {
    pub key: usize,
    pub offset: i32,
    pub format: OutputFormat,
}

pub async fn cmd_track(
    config: &Config,
    args: TrackArgs,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let client = build_client(config)?;
    let report = ingest(config, &client).await;
    if report.store.is_empty() {
        bail!("No snapshot could be loaded; nothing to track");
    }

    let map = Arc::new(TerminalMapView::new());
    let mut controller = controller(config, &client, report.into_store(), map.clone());
    controller
        .set_offset(args.offset)
        .with_context(|| format!("Invalid offset {}", args.offset))?;

    let key = ObjectKey::new(args.key);
    let batch = controller.select_balloon(key)?;
    let series = batch.await.context("Weather fetch task failed")?;
    tracing::debug!("{} forecasts available for {}", series.len(), key);

    let Some(readout) = controller.readout().await else {
        bail!("Nothing selected");
    };
    let marks = controller.slider_marks().await;

    let content = match args.format {
        OutputFormat::Json => format_track_json(&readout, map.centre(), &marks, opts)?,
        OutputFormat::Text => format_track_text(&readout, map.centre(), &marks, opts),
    };
    write_output(output, &content)
}
