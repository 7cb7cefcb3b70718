//! Flight-state ingestion from the upstream bounding-box API.
//!
//! This module issues one HTTP GET per refresh cycle against the `/states/all`
//! endpoint, normalizes the raw state vectors into [`FlightRecord`]s, and
//! enforces a minimum inter-request spacing when operating without
//! credentials. Every upstream failure degrades to an empty batch; the next
//! scheduled cycle is the retry.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::flight::FlightRecord;

/// Minimum spacing between anonymous requests.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(10);

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A rectangular geographic query region, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude.
    pub min_latitude: f64,
    /// Maximum latitude.
    pub max_latitude: f64,
    /// Minimum longitude.
    pub min_longitude: f64,
    /// Maximum longitude.
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Query parameters in the upstream API's naming.
    #[must_use]
    pub fn query_params(&self) -> [(&'static str, f64); 4] {
        [
            ("lamin", self.min_latitude),
            ("lamax", self.max_latitude),
            ("lomin", self.min_longitude),
            ("lomax", self.max_longitude),
        ]
    }
}

/// Top-level shape of the upstream response.
#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Option<Vec<Vec<Value>>>,
}

/// Fetches flight states for a fixed region.
///
/// Holds a single timestamp of last-request time as its whole rate-limiter
/// state. One instance is meant to be driven serially by the refresh loop;
/// there is no retry inside a call.
#[derive(Debug)]
pub struct RegionFetcher {
    client: reqwest::Client,
    base_url: String,
    bounds: BoundingBox,
    credentials: Option<(String, String)>,
    min_request_interval: Duration,
    last_request: Option<Instant>,
}

impl RegionFetcher {
    /// Create a fetcher for the configured region.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let credentials = config.credentials();
        if credentials.is_none() {
            warn!("using anonymous API access (rate limited)");
        } else {
            info!("using authenticated API access");
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api.base_url.clone(),
            bounds: config.bounding_box(),
            credentials,
            min_request_interval: MIN_REQUEST_INTERVAL,
            last_request: None,
        })
    }

    /// Override the minimum inter-request spacing.
    #[must_use]
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// The bounding box this fetcher queries.
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Fetch the current state vectors for the region.
    ///
    /// Blocks until the rate-limit spacing has elapsed (anonymous access
    /// only), then issues a single bounded-timeout GET. HTTP 429, any other
    /// non-success status, network failures, and malformed payloads all yield
    /// an empty batch with a log line.
    pub async fn fetch(&mut self) -> Vec<FlightRecord> {
        self.wait_for_rate_limit().await;

        let url = format!("{}/states/all", self.base_url);
        let mut request = self.client.get(&url).query(&self.bounds.query_params());
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        debug!("fetching flight states from {url}");
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!("flight-state request failed: {err}");
                return Vec::new();
            }
        };

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("upstream rate limit exceeded; returning no data");
            return Vec::new();
        }
        if !response.status().is_success() {
            warn!(
                "upstream returned {}; returning no data",
                response.status()
            );
            return Vec::new();
        }

        let payload: StatesResponse = match response.json().await {
            Ok(payload) => payload,
            Err(err) => {
                warn!("malformed flight-state payload: {err}");
                return Vec::new();
            }
        };

        let Some(states) = payload.states else {
            info!("no flight data available in the region");
            return Vec::new();
        };

        let records: Vec<FlightRecord> = states
            .iter()
            .filter_map(|row| FlightRecord::from_state_vector(row))
            .collect();

        info!("retrieved {} flights", records.len());
        records
    }

    /// Ensure the anonymous rate limit is respected.
    ///
    /// Authenticated clients are not throttled, but the last-request time is
    /// recorded either way.
    async fn wait_for_rate_limit(&mut self) {
        if self.credentials.is_none() {
            if let Some(last) = self.last_request {
                let elapsed = last.elapsed();
                if elapsed < self.min_request_interval {
                    let wait = self.min_request_interval - elapsed;
                    debug!("rate limiting: waiting {:.1}s", wait.as_secs_f64());
                    tokio::time::sleep(wait).await;
                }
            }
        }
        self.last_request = Some(Instant::now());
    }
}
