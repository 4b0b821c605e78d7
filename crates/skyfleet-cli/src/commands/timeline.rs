//! Timeline command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use futures::future::join_all;
use skyfleet_core::{Config, HourOffset, ObjectKey};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_timeline_json, format_timeline_text};
use crate::util::{TerminalMapView, build_client, controller, ingest, write_output};

pub async fn cmd_timeline(
    config: &Config,
    key: usize,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let client = build_client(config)?;
    let report = ingest(config, &client).await;
    if report.store.is_empty() {
        bail!("No snapshot could be loaded; nothing to show");
    }

    let map = Arc::new(TerminalMapView::new());
    let mut controller = controller(config, &client, report.into_store(), map);
    let key = ObjectKey::new(key);
    controller
        .select_balloon(key)?
        .await
        .context("Weather fetch task failed")?;

    let readouts = join_all(HourOffset::all().map(|offset| controller.readout_at(key, offset))).await;

    let content = match format {
        OutputFormat::Json => format_timeline_json(&readouts, opts)?,
        OutputFormat::Text => format_timeline_text(key, &readouts),
    };
    write_output(output, &content)
}
