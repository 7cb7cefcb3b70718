//! End-to-end pipeline tests against a mocked upstream API.
//!
//! Exercises the full fetch, normalize, score, and persist path with a
//! file-backed database, including restarts against an existing database
//! and persisted model.

use std::path::Path;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skywatch::{Config, FlightStore, Pipeline, RegionFetcher, RiskScorer};

fn test_config(server_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = server_url.to_string();
    config.region.min_latitude = 41.5;
    config.region.max_latitude = 51.5;
    config.storage.database_path = Some(dir.join("flights.db"));
    config.storage.model_path = Some(dir.join("models/delay_model.json"));
    config.storage.scaler_path = Some(dir.join("models/delay_scaler.json"));
    config
}

fn build_pipeline(config: &Config) -> Pipeline {
    let fetcher = RegionFetcher::new(config)
        .unwrap()
        .with_min_request_interval(Duration::ZERO);
    let scorer = RiskScorer::open(config).unwrap();
    let store = FlightStore::open(config.database_path()).unwrap();
    Pipeline::from_parts(fetcher, scorer, store)
}

fn states_body(states: serde_json::Value) -> serde_json::Value {
    json!({ "time": 1_700_000_000, "states": states })
}

#[tokio::test]
async fn test_end_to_end_cycle_persists_flights_and_predictions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/states/all"))
        .and(query_param("lamin", "41.5"))
        .and(query_param("lamax", "51.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(states_body(json!([
            // Complete row.
            ["abc123", "UAL123  ", "United States", null, 1_700_000_000,
             -0.5, 45.0, 10_000.0, false, 250.0, 90.0],
            // Null position, must be dropped.
            ["dead00", "GHOST1", "Nowhere", null, 1_700_000_000,
             null, null, 9_000.0, false, 240.0, 10.0],
            // Slow and low, should score as likely delayed.
            ["def456", "AFR777 ", "France", null, 1_700_000_000,
             2.5, 48.0, 6_000.0, false, 150.0, 180.0],
        ]))))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let mut pipeline = build_pipeline(&config);

    let summary = pipeline.run_cycle().await.unwrap();
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.stored, 2);
    assert_eq!(summary.scored, 2);
    assert!((0.0..=1.0).contains(&summary.mean_probability));

    // Model files persisted next to each other.
    assert!(config.model_path().exists());
    assert!(config.scaler_path().exists());

    // Reopen the database independently and check what landed.
    let store = FlightStore::open(config.database_path()).unwrap();
    let flights = store.recent(10).unwrap();
    assert_eq!(flights.len(), 2);
    assert!(flights.iter().all(|f| f.icao24 != "dead00"));

    let ual = flights.iter().find(|f| f.icao24 == "abc123").unwrap();
    assert_eq!(ual.callsign.as_deref(), Some("UAL123"));
    assert!((ual.altitude - 10_000.0).abs() < f64::EPSILON);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_predictions, 2);
}

#[tokio::test]
async fn test_restart_reuses_database_and_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/states/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(states_body(json!([
            ["abc123", "UAL123", "United States", null, 1_700_000_000,
             -0.5, 45.0, 10_000.0, false, 250.0, 90.0],
        ]))))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());

    {
        let mut pipeline = build_pipeline(&config);
        pipeline.run_cycle().await.unwrap();
    }
    let model_bytes = std::fs::read(config.model_path()).unwrap();

    // Second process start: loads the model instead of training.
    let mut pipeline = build_pipeline(&config);
    pipeline.run_cycle().await.unwrap();

    assert_eq!(std::fs::read(config.model_path()).unwrap(), model_bytes);
    assert_eq!(pipeline.store().count().unwrap(), 2);
}

#[tokio::test]
async fn test_upstream_outage_then_recovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/states/all"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/states/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(states_body(json!([
            ["abc123", "UAL123", "United States", null, 1_700_000_000,
             -0.5, 45.0, 10_000.0, false, 250.0, 90.0],
        ]))))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let mut pipeline = build_pipeline(&config);

    // Rate-limited cycle completes empty instead of failing.
    let first = pipeline.run_cycle().await.unwrap();
    assert_eq!(first.fetched, 0);
    assert_eq!(pipeline.store().count().unwrap(), 0);

    // Next cycle proceeds normally.
    let second = pipeline.run_cycle().await.unwrap();
    assert_eq!(second.stored, 1);
    assert_eq!(pipeline.store().count().unwrap(), 1);
}

#[tokio::test]
async fn test_empty_region_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/states/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(states_body(json!(null))))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&server.uri(), dir.path());
    let mut pipeline = build_pipeline(&config);

    let summary = pipeline.run_cycle().await.unwrap();
    assert_eq!(summary.fetched, 0);
    assert!((summary.mean_probability - 0.0).abs() < f64::EPSILON);
}
