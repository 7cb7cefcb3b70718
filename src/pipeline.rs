//! The fetch, score, and persist cycle.
//!
//! A [`Pipeline`] wires the region fetcher, the risk scorer, and the flight
//! store together. Each call to [`Pipeline::run_cycle`] performs one complete
//! poll: fetch the current picture, persist the observations, and record a
//! delay prediction for every stored row.

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::fetch::RegionFetcher;
use crate::scoring::RiskScorer;
use crate::storage::FlightStore;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleSummary {
    /// Records fetched and normalized from the upstream API.
    pub fetched: usize,
    /// Rows written to the flights table.
    pub stored: usize,
    /// Predictions recorded.
    pub scored: usize,
    /// Mean delay probability across the batch; 0.0 for an empty batch.
    pub mean_probability: f64,
}

/// The assembled ingestion pipeline.
#[derive(Debug)]
pub struct Pipeline {
    fetcher: RegionFetcher,
    scorer: RiskScorer,
    store: FlightStore,
}

impl Pipeline {
    /// Build a pipeline from configuration.
    ///
    /// Opens (or creates) the database and loads or trains the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the fetcher, scorer, or store cannot be
    /// constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher = RegionFetcher::new(config)?;
        let scorer = RiskScorer::open(config)?;
        let store = FlightStore::open(config.database_path())?;
        Ok(Self {
            fetcher,
            scorer,
            store,
        })
    }

    /// Build a pipeline from already constructed parts.
    #[must_use]
    pub fn from_parts(fetcher: RegionFetcher, scorer: RiskScorer, store: FlightStore) -> Self {
        Self {
            fetcher,
            scorer,
            store,
        }
    }

    /// The underlying flight store.
    #[must_use]
    pub fn store(&self) -> &FlightStore {
        &self.store
    }

    /// Run one fetch, persist, and score cycle.
    ///
    /// An upstream failure yields an empty batch, which completes the cycle
    /// with zero counts rather than failing it.
    ///
    /// # Errors
    ///
    /// Returns an error if a database write fails.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary> {
        let records = self.fetcher.fetch().await;
        let fetched = records.len();

        if records.is_empty() {
            warn!("cycle completed with no flights");
            return Ok(CycleSummary {
                fetched: 0,
                stored: 0,
                scored: 0,
                mean_probability: 0.0,
            });
        }

        let stored = self.store.append(&records)?;

        let mut scored = 0;
        let mut probability_sum = 0.0;
        for record in &records {
            let probability = self.scorer.score(record);
            self.store.record_score(&record.icao24, probability)?;
            probability_sum += probability;
            scored += 1;
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_probability = probability_sum / scored as f64;
        info!(
            "cycle complete: {fetched} fetched, {stored} stored, {scored} scored, \
             mean delay probability {mean_probability:.3}"
        );

        Ok(CycleSummary {
            fetched,
            stored,
            scored,
            mean_probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_url: &str, dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.api.base_url = server_url.to_string();
        config.storage.model_path = Some(dir.join("delay_model.json"));
        config.storage.scaler_path = Some(dir.join("delay_scaler.json"));
        config
    }

    /// Model files shared across tests so only the first open trains.
    fn shared_model_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("skywatch_pipeline_{}", std::process::id()))
    }

    fn state_vector(icao24: &str, timestamp: i64) -> serde_json::Value {
        json!([
            icao24,
            "UAL123  ",
            "United States",
            null,
            timestamp,
            -0.5,
            45.0,
            10_000.0,
            false,
            250.0,
            90.0
        ])
    }

    fn pipeline_for(server: &MockServer) -> Pipeline {
        let config = test_config(&server.uri(), &shared_model_dir());
        let fetcher = RegionFetcher::new(&config)
            .unwrap()
            .with_min_request_interval(std::time::Duration::ZERO);
        let scorer = RiskScorer::open(&config).unwrap();
        let store = FlightStore::open_in_memory().unwrap();
        Pipeline::from_parts(fetcher, scorer, store)
    }

    #[tokio::test]
    async fn test_cycle_stores_and_scores_batch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/states/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time": 1_700_000_000,
                "states": [
                    state_vector("abc123", 1_700_000_000),
                    state_vector("def456", 1_700_000_000),
                ]
            })))
            .mount(&server)
            .await;

        let mut pipeline = pipeline_for(&server);
        let summary = pipeline.run_cycle().await.unwrap();

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.stored, 2);
        assert_eq!(summary.scored, 2);
        assert!((0.0..=1.0).contains(&summary.mean_probability));

        let stats = pipeline.store().stats().unwrap();
        assert_eq!(stats.total_flights, 2);
        assert_eq!(stats.total_predictions, 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_yields_empty_cycle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/states/all"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut pipeline = pipeline_for(&server);
        let summary = pipeline.run_cycle().await.unwrap();

        assert_eq!(
            summary,
            CycleSummary {
                fetched: 0,
                stored: 0,
                scored: 0,
                mean_probability: 0.0
            }
        );
        assert_eq!(pipeline.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_consecutive_cycles_accumulate_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/states/all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time": 1_700_000_000,
                "states": [state_vector("abc123", 1_700_000_000)]
            })))
            .mount(&server)
            .await;

        let mut pipeline = pipeline_for(&server);
        pipeline.run_cycle().await.unwrap();
        pipeline.run_cycle().await.unwrap();

        assert_eq!(pipeline.store().count().unwrap(), 2);
    }
}
