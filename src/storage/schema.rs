//! `SQLite` schema definitions for skywatch.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the flights table.
///
/// `timestamp` is the upstream observation time as unix seconds; `created_at`
/// records when the row was written locally.
pub const CREATE_FLIGHTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    icao24 TEXT NOT NULL,
    callsign TEXT,
    origin_country TEXT NOT NULL,
    longitude REAL NOT NULL,
    latitude REAL NOT NULL,
    altitude REAL NOT NULL,
    velocity REAL NOT NULL,
    heading REAL NOT NULL,
    on_ground INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on timestamp for recency queries.
pub const CREATE_FLIGHTS_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_timestamp ON flights(timestamp DESC)
";

/// SQL statement to create an index on `icao24` for per-aircraft filtering.
pub const CREATE_FLIGHTS_ICAO_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_flights_icao24 ON flights(icao24)
";

/// SQL statement to create the predictions table.
pub const CREATE_PREDICTIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    icao24 TEXT NOT NULL,
    delay_probability REAL NOT NULL,
    predicted_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on `icao24` for prediction lookups.
pub const CREATE_PREDICTIONS_ICAO_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_predictions_icao24 ON predictions(icao24)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_FLIGHTS_TABLE,
    CREATE_FLIGHTS_TIMESTAMP_INDEX,
    CREATE_FLIGHTS_ICAO_INDEX,
    CREATE_PREDICTIONS_TABLE,
    CREATE_PREDICTIONS_ICAO_INDEX,
    CREATE_METADATA_TABLE,
];
