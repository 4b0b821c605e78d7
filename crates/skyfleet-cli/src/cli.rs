//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Feed overrides shared by every command
#[derive(Debug, Clone, Default, Args)]
pub struct FeedArgs {
    /// Base URL of the hourly snapshot feed
    #[arg(long, global = true, env = "SKYFLEET_SNAPSHOT_URL")]
    pub snapshot_url: Option<String>,

    /// Forecast endpoint URL
    #[arg(long, global = true, env = "SKYFLEET_FORECAST_URL")]
    pub forecast_url: Option<String>,

    /// IANA timezone for forecast windows and hour labels
    #[arg(long, global = true, env = "SKYFLEET_TIMEZONE")]
    pub timezone: Option<String>,
}

#[derive(Parser)]
#[command(name = "skyfleet")]
#[command(author, version, about = "Balloon fleet trajectories with per-hour weather", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "SKYFLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub feeds: FeedArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest the last 24 hours and list every object's latest position
    Fleet {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Show at most this many objects (0 for all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Select one object and show its position and weather at an hour
    Track {
        /// Object key (position within the snapshot array)
        key: usize,

        /// Relative hour, 0 (now) to -23
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        offset: i32,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one object's position and weather for every hour of the window
    Timeline {
        /// Object key (position within the snapshot array)
        key: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_track_negative_offset() {
        let cli = Cli::try_parse_from(["skyfleet", "track", "4", "--offset", "-6"]).unwrap();
        match cli.command {
            Commands::Track {
                key,
                offset,
                format,
            } => {
                assert_eq!(key, 4);
                assert_eq!(offset, -6);
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("expected track"),
        }
    }

    #[test]
    fn test_global_feed_overrides() {
        let cli = Cli::try_parse_from([
            "skyfleet",
            "fleet",
            "--format",
            "json",
            "--timezone",
            "Europe/Berlin",
            "--snapshot-url",
            "http://localhost:8080",
        ])
        .unwrap();

        assert_eq!(cli.feeds.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(cli.feeds.snapshot_url.as_deref(), Some("http://localhost:8080"));
        assert!(matches!(
            cli.command,
            Commands::Fleet {
                format: OutputFormat::Json,
                limit: 0
            }
        ));
    }
}
