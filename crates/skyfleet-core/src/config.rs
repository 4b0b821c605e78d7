//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty or missing file
//! yields a working configuration pointed at the public feeds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_FORECAST_URL, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SNAPSHOT_BASE_URL, FeedEndpoints};
use crate::ingest::IngestOptions;
use crate::retry::RetryConfig;
use crate::time_index::local_timezone;
use crate::weather::ForecastOptions;

/// Shortest accepted request timeout in seconds.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 1;
/// Longest accepted request timeout in seconds (5 minutes).
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;
/// Most retries accepted for any feed.
pub const MAX_RETRIES: u32 = 10;

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed locations and transport settings.
    pub feeds: FeedsConfig,
    /// Forecast request options.
    pub forecast: ForecastConfig,
    /// Snapshot ingestion settings.
    pub ingest: IngestConfig,
    /// Weather fetch settings.
    pub weather: WeatherConfig,
}

impl Config {
    /// Load configuration from the default path, or defaults if it is absent.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Feed URLs use http or https
    /// - The request timeout is between 1 and 300 seconds
    /// - The forecast timezone is not empty
    /// - Retry counts are at most 10
    ///
    /// # Example
    ///
    /// ```
    /// use skyfleet_core::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.feeds.validate());
        errors.extend(self.forecast.validate());
        errors.extend(validate_retries("ingest.retries", self.ingest.retries));
        errors.extend(validate_retries("weather.retries", self.weather.retries));

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Feed endpoints for the HTTP client.
    pub fn endpoints(&self) -> FeedEndpoints {
        FeedEndpoints::new(&self.feeds.snapshot_base_url, &self.feeds.forecast_url)
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.feeds.request_timeout_secs)
    }

    /// Options for the snapshot ingestor.
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions::new()
            .concurrent(self.ingest.concurrent)
            .strict_alignment(self.ingest.strict_alignment)
    }

    /// Options shared by every forecast request.
    pub fn forecast_options(&self) -> ForecastOptions {
        ForecastOptions::new(&self.forecast.timezone)
    }

    /// Retry policy for snapshot requests.
    pub fn snapshot_retry(&self) -> RetryConfig {
        RetryConfig::for_snapshot().max_retries(self.ingest.retries)
    }

    /// Retry policy for forecast requests.
    pub fn forecast_retry(&self) -> RetryConfig {
        RetryConfig::for_forecast().max_retries(self.weather.retries)
    }
}

/// Feed locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Directory holding the hourly snapshot files.
    pub snapshot_base_url: String,
    /// Forecast endpoint.
    pub forecast_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            snapshot_base_url: DEFAULT_SNAPSHOT_BASE_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl FeedsConfig {
    /// Validate feed configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, url) in [
            ("feeds.snapshot_base_url", &self.snapshot_base_url),
            ("feeds.forecast_url", &self.forecast_url),
        ] {
            if url.is_empty() {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "URL cannot be empty".to_string(),
                });
            } else if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("invalid URL '{}': must start with http:// or https://", url),
                });
            }
        }

        if !(MIN_REQUEST_TIMEOUT_SECS..=MAX_REQUEST_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            errors.push(ValidationError {
                field: "feeds.request_timeout_secs".to_string(),
                message: format!(
                    "timeout {} is out of range (must be {}-{} seconds)",
                    self.request_timeout_secs, MIN_REQUEST_TIMEOUT_SECS, MAX_REQUEST_TIMEOUT_SECS
                ),
            });
        }

        errors
    }
}

/// Forecast request options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// IANA timezone for the hourly window (e.g. `UTC`, `Europe/Berlin`).
    /// Defaults to the machine's own zone.
    pub timezone: String,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            timezone: local_timezone(),
        }
    }
}

impl ForecastConfig {
    /// Validate forecast configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.timezone.trim().is_empty() {
            errors.push(ValidationError {
                field: "forecast.timezone".to_string(),
                message: "timezone cannot be empty".to_string(),
            });
        }
        errors
    }
}

/// Snapshot ingestion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Request all hours at once.
    pub concurrent: bool,
    /// Reject snapshots whose object count disagrees with the latest one.
    pub strict_alignment: bool,
    /// Retries per snapshot hour.
    pub retries: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrent: true,
            strict_alignment: false,
            retries: 2,
        }
    }
}

/// Weather fetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Retries per forecast request.
    pub retries: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self { retries: 1 }
    }
}

fn validate_retries(field: &str, retries: u32) -> Option<ValidationError> {
    (retries > MAX_RETRIES).then(|| ValidationError {
        field: field.to_string(),
        message: format!("{} retries is too many (max {})", retries, MAX_RETRIES),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `feeds.forecast_url`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyfleet")
        .join("config.toml")
}
