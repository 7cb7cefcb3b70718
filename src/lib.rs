//! `skywatch` - flight-state ingestion and delay-risk scoring
//!
//! This library polls a public flight-state API for a geographic region,
//! normalizes the raw state vectors into flat records, scores each record
//! with a small pre-trained classifier, and persists both observations and
//! scores in a local `SQLite` database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod flight;
pub mod logging;
pub mod pipeline;
pub mod scoring;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use fetch::{BoundingBox, RegionFetcher};
pub use flight::FlightRecord;
pub use logging::init_logging;
pub use pipeline::{CycleSummary, Pipeline};
pub use scoring::RiskScorer;
pub use storage::{FlightStore, StoreStats};
