//! HTTP client for the snapshot and forecast feeds.
//!
//! [`HttpFeedClient`] implements both [`SnapshotSource`] and
//! [`ForecastSource`] on top of a single `reqwest` client with a request
//! timeout, so a hung server surfaces as a retryable fetch failure.
//!
//! # Example
//!
//! ```no_run
//! use skyfleet_core::{FeedEndpoints, HttpFeedClient, SnapshotSource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpFeedClient::new(FeedEndpoints::default())?;
//! let snapshot = client.fetch_snapshot(0).await?;
//! println!("{} objects reported this hour", snapshot.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Request, Response};
use tracing::debug;

use skyfleet_types::{ForecastPayload, Snapshot};

use crate::error::{Error, Result};
use crate::ingest::snapshot_path;
use crate::traits::{ForecastSource, SnapshotSource};
use crate::weather::ForecastQuery;

/// Default base URL of the hourly snapshot feed.
pub const DEFAULT_SNAPSHOT_BASE_URL: &str = "https://a.windbornesystems.com/treasure";

/// Default forecast endpoint.
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the two feeds live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    /// Directory holding `00.json` through `23.json`.
    pub snapshot_base_url: String,
    /// Forecast endpoint queried with [`ForecastQuery::params`].
    pub forecast_url: String,
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            snapshot_base_url: DEFAULT_SNAPSHOT_BASE_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
        }
    }
}

impl FeedEndpoints {
    /// Endpoints with custom URLs.
    pub fn new(snapshot_base_url: impl Into<String>, forecast_url: impl Into<String>) -> Self {
        Self {
            snapshot_base_url: snapshot_base_url.into(),
            forecast_url: forecast_url.into(),
        }
    }

    /// Full URL of the snapshot for `hour`.
    pub fn snapshot_url(&self, hour: u8) -> String {
        format!("{}/{}", self.snapshot_base_url, snapshot_path(hour))
    }
}

/// `reqwest`-backed feed client.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
    endpoints: FeedEndpoints,
    timeout: Duration,
}

impl HttpFeedClient {
    /// Create a client with the default request timeout.
    pub fn new(endpoints: FeedEndpoints) -> Result<Self> {
        Self::with_timeout(endpoints, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(endpoints: FeedEndpoints, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::invalid_config(format!("HTTP client: {}", e)))?;
        Self::build(endpoints, client, timeout)
    }

    /// Create a client around a preconfigured `reqwest` client.
    ///
    /// `timeout` is only used to describe timeouts in errors; the client's
    /// own timeout setting applies.
    pub fn with_client(endpoints: FeedEndpoints, client: Client, timeout: Duration) -> Result<Self> {
        Self::build(endpoints, client, timeout)
    }

    fn build(endpoints: FeedEndpoints, client: Client, timeout: Duration) -> Result<Self> {
        let endpoints = FeedEndpoints {
            snapshot_base_url: normalize_url("snapshot_base_url", &endpoints.snapshot_base_url)?,
            forecast_url: normalize_url("forecast_url", &endpoints.forecast_url)?,
        };
        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    /// The normalized endpoints.
    pub fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, request: Request) -> Result<Vec<u8>> {
        let url = request.url().to_string();
        debug!("GET {}", url);

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        self.handle_response(&url, response).await
    }

    async fn handle_response(&self, url: &str, response: Response) -> Result<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch_status(url, status.as_u16()));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, e))?;
        Ok(body.to_vec())
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::fetch_timeout(url, self.timeout)
        } else {
            Error::fetch_transport(url, e.to_string())
        }
    }
}

/// Trim trailing slashes and require an http(s) scheme.
fn normalize_url(field: &str, url: &str) -> Result<String> {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(Error::invalid_config(format!(
            "{} must start with http:// or https://, got: {}",
            field, url
        )));
    }
    Ok(url.to_string())
}

#[async_trait]
impl SnapshotSource for HttpFeedClient {
    async fn fetch_snapshot(&self, hour: u8) -> Result<Snapshot> {
        let url = self.endpoints.snapshot_url(hour);
        let request = self
            .client
            .get(&url)
            .build()
            .map_err(|e| Error::fetch_transport(&url, e.to_string()))?;

        let body = self.execute(request).await?;
        Snapshot::from_json(&body).map_err(|e| Error::parse(url, e))
    }
}

#[async_trait]
impl ForecastSource for HttpFeedClient {
    async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<ForecastPayload> {
        let request = self
            .client
            .get(&self.endpoints.forecast_url)
            .query(&query.params())
            .build()
            .map_err(|e| Error::fetch_transport(&self.endpoints.forecast_url, e.to_string()))?;
        let url = request.url().to_string();

        let body = self.execute(request).await?;
        ForecastPayload::from_json(&body).map_err(|e| Error::parse(url, e))
    }
}
