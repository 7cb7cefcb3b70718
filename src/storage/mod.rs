//! Storage layer for skywatch.
//!
//! This module provides `SQLite`-based persistent storage for normalized
//! flight observations and the delay predictions computed for them.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::flight::FlightRecord;

/// Storage engine for flight observations and delay predictions.
///
/// Rows are append-only; every poll cycle inserts fresh observations rather
/// than updating aircraft in place, so the history of a flight is the set of
/// its rows over time.
#[derive(Debug)]
pub struct FlightStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl FlightStore {
    /// Open or create a flight database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL keeps reads cheap while the watch loop appends.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of observations, one row per record.
    ///
    /// An empty batch is a no-op. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; rows inserted before the
    /// failure remain.
    pub fn append(&self, records: &[FlightRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        for record in records {
            self.conn.execute(
                r"
                INSERT INTO flights (
                    icao24, callsign, origin_country,
                    longitude, latitude, altitude,
                    velocity, heading, on_ground, timestamp
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
                params![
                    record.icao24,
                    record.callsign,
                    record.origin_country,
                    record.longitude,
                    record.latitude,
                    record.altitude,
                    record.velocity,
                    record.heading,
                    record.on_ground,
                    record.timestamp,
                ],
            )?;
        }

        debug!("appended {} flight rows", records.len());
        Ok(records.len())
    }

    /// Get a flight row by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: i64) -> Result<Option<FlightRecord>> {
        let result = self
            .conn
            .query_row(
                r"
                SELECT id, icao24, callsign, origin_country,
                       longitude, latitude, altitude,
                       velocity, heading, on_ground, timestamp
                FROM flights WHERE id = ?1
                ",
                [id],
                Self::row_to_record,
            )
            .optional()?;
        Ok(result)
    }

    /// Get the most recently observed flights, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent(&self, limit: usize) -> Result<Vec<FlightRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, icao24, callsign, origin_country,
                   longitude, latitude, altitude,
                   velocity, heading, on_ground, timestamp
            FROM flights ORDER BY timestamp DESC, id DESC LIMIT ?1
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map([limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Get observations of a specific aircraft, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn by_aircraft(&self, icao24: &str, limit: usize) -> Result<Vec<FlightRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, icao24, callsign, origin_country,
                   longitude, latitude, altitude,
                   velocity, heading, on_ground, timestamp
            FROM flights WHERE icao24 = ?1
            ORDER BY timestamp DESC, id DESC LIMIT ?2
            ",
        )?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![icao24, limit_i64], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Record a delay prediction for an aircraft.
    ///
    /// Returns the assigned row ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_score(&self, icao24: &str, delay_probability: f64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO predictions (icao24, delay_probability) VALUES (?1, ?2)",
            params![icao24, delay_probability],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Count total flight rows in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM flights", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let total_flights = self.count()?;

        let total_predictions: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM predictions", [], |row| row.get(0))?;

        let distinct_aircraft: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT icao24) FROM flights", [], |row| {
                    row.get(0)
                })?;

        let oldest: Option<i64> = self
            .conn
            .query_row("SELECT MIN(timestamp) FROM flights", [], |row| row.get(0))?;
        let newest: Option<i64> = self
            .conn
            .query_row("SELECT MAX(timestamp) FROM flights", [], |row| row.get(0))?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            total_flights,
            total_predictions,
            distinct_aircraft,
            oldest_observation: oldest.and_then(to_datetime),
            newest_observation: newest.and_then(to_datetime),
            db_size_bytes,
        })
    }

    /// Convert a database row to a `FlightRecord`.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<FlightRecord> {
        Ok(FlightRecord {
            id: Some(row.get(0)?),
            icao24: row.get(1)?,
            callsign: row.get(2)?,
            origin_country: row.get(3)?,
            longitude: row.get(4)?,
            latitude: row.get(5)?,
            altitude: row.get(6)?,
            velocity: row.get(7)?,
            heading: row.get(8)?,
            on_ground: row.get(9)?,
            timestamp: row.get(10)?,
        })
    }
}

fn to_datetime(unix_seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(unix_seconds, 0).single()
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Total number of flight rows stored.
    pub total_flights: i64,
    /// Total number of delay predictions stored.
    pub total_predictions: i64,
    /// Number of distinct aircraft observed.
    pub distinct_aircraft: i64,
    /// Observation time of the oldest flight row.
    pub oldest_observation: Option<DateTime<Utc>>,
    /// Observation time of the newest flight row.
    pub newest_observation: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
