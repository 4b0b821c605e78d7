//! Fleet command implementation.

use std::path::PathBuf;

use anyhow::Result;
use skyfleet_core::Config;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_fleet_json, format_fleet_text};
use crate::util::{build_client, ingest, write_output};

pub async fn cmd_fleet(
    config: &Config,
    format: OutputFormat,
    limit: usize,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let client = build_client(config)?;
    let report = ingest(config, &client).await;

    if report.store.is_empty() {
        tracing::warn!("No snapshot could be loaded");
    }

    let content = match format {
        OutputFormat::Json => format_fleet_json(&report, limit, opts)?,
        OutputFormat::Text => format_fleet_text(&report, limit, opts),
    };
    write_output(output, &content)
}
