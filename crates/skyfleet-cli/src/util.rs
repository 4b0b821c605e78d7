//! Shared helpers for building an engine session from CLI arguments.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use skyfleet_core::{
    Config, HttpFeedClient, IngestReport, MapView, SelectionController, SnapshotIngestor,
    SystemClock, TrajectoryStore, WeatherCache, default_config_path,
};
use skyfleet_types::Position;

use crate::cli::FeedArgs;

/// Load configuration, apply command-line overrides and validate the result.
pub fn resolve_config(path: Option<&Path>, feeds: &FeedArgs) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default = default_config_path();
            tracing::debug!("Using config from {}", default.display());
            Config::load_default()?
        }
    };
    apply_overrides(&mut config, feeds);
    config.validate()?;
    Ok(config)
}

/// Overwrite config values with any flags the user passed.
pub fn apply_overrides(config: &mut Config, feeds: &FeedArgs) {
    if let Some(url) = &feeds.snapshot_url {
        config.feeds.snapshot_base_url = url.clone();
    }
    if let Some(url) = &feeds.forecast_url {
        config.feeds.forecast_url = url.clone();
    }
    if let Some(timezone) = &feeds.timezone {
        config.forecast.timezone = timezone.clone();
    }
}

/// Build the HTTP client for both feeds.
pub fn build_client(config: &Config) -> Result<Arc<HttpFeedClient>> {
    let client = HttpFeedClient::with_timeout(config.endpoints(), config.request_timeout())
        .context("Failed to create feed client")?;
    Ok(Arc::new(client))
}

/// Run one ingestion pass.
pub async fn ingest(config: &Config, client: &Arc<HttpFeedClient>) -> IngestReport {
    SnapshotIngestor::with_options(client.clone(), config.ingest_options())
        .retry(config.snapshot_retry())
        .ingest_all()
        .await
}

/// Build a controller over `store` that reports pans to `map`.
pub fn controller(
    config: &Config,
    client: &Arc<HttpFeedClient>,
    store: TrajectoryStore,
    map: Arc<TerminalMapView>,
) -> SelectionController {
    let weather = WeatherCache::with_options(client.clone(), config.forecast_options())
        .retry(config.forecast_retry());
    SelectionController::new(
        Arc::new(store),
        Arc::new(weather),
        map,
        Arc::new(SystemClock::for_timezone(&config.forecast.timezone)),
    )
}

/// [`MapView`] for a terminal: there is no map, so pans are logged and kept
/// for the report.
#[derive(Debug, Default)]
pub struct TerminalMapView {
    centre: Mutex<Option<Position>>,
}

impl TerminalMapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the map was last asked to centre.
    pub fn centre(&self) -> Option<Position> {
        *self.centre.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MapView for TerminalMapView {
    fn pan_to(&self, position: Position) {
        tracing::debug!("Map centred on {}", position);
        *self.centre.lock().unwrap_or_else(PoisonError::into_inner) = Some(position);
    }
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
