mod cli;
mod commands;
mod format;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::{TrackArgs, cmd_fleet, cmd_timeline, cmd_track};
use crate::format::FormatOptions;
use crate::util::resolve_config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(cli.config.as_deref(), &cli.feeds)?;
    let opts = FormatOptions::new(cli.no_color, cli.compact);
    let output = cli.output.as_ref();

    match cli.command {
        Commands::Fleet { format, limit } => {
            cmd_fleet(&config, format, limit, output, &opts).await?;
        }
        Commands::Track {
            key,
            offset,
            format,
        } => {
            let args = TrackArgs {
                key,
                offset,
                format,
            };
            cmd_track(&config, args, output, &opts).await?;
        }
        Commands::Timeline { key, format } => {
            cmd_timeline(&config, key, format, output, &opts).await?;
        }
    }

    Ok(())
}
