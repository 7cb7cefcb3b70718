//! Core flight record types for skywatch.
//!
//! This module defines the flat record shape that raw upstream state vectors
//! are normalized into before scoring and persistence.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed position of each field inside an upstream state vector.
mod position {
    pub const ICAO24: usize = 0;
    pub const CALLSIGN: usize = 1;
    pub const ORIGIN_COUNTRY: usize = 2;
    pub const TIMESTAMP: usize = 4;
    pub const LONGITUDE: usize = 5;
    pub const LATITUDE: usize = 6;
    pub const ALTITUDE: usize = 7;
    pub const ON_GROUND: usize = 8;
    pub const VELOCITY: usize = 9;
    pub const HEADING: usize = 10;
}

/// One observed aircraft state at a point in time.
///
/// A record is only constructed when both longitude and latitude are present
/// in the source payload; rows failing this are dropped during ingestion.
/// Records are immutable after creation and are persisted by append only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Unique identifier for this record (assigned by the storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Aircraft transponder identifier. Not guaranteed unique across time.
    pub icao24: String,

    /// Flight callsign, trimmed of surrounding whitespace. Absent when the
    /// source value is null or blank.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,

    /// Country the aircraft is registered in.
    pub origin_country: String,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Latitude in degrees.
    pub latitude: f64,

    /// Barometric altitude in meters. 0 when the source value is absent.
    pub altitude: f64,

    /// Ground speed in m/s. 0 when the source value is absent.
    pub velocity: f64,

    /// Heading in degrees. 0 when the source value is absent.
    pub heading: f64,

    /// Whether the aircraft is on the ground.
    pub on_ground: bool,

    /// Observation time as Unix seconds, source-provided.
    pub timestamp: i64,
}

impl FlightRecord {
    /// Normalize one raw state vector into a record.
    ///
    /// Returns `None` when the longitude or latitude position is null or
    /// non-numeric, or when the identifier is missing. Numeric fields default
    /// to 0 when null; the callsign is trimmed and treated as absent when
    /// empty.
    #[must_use]
    pub fn from_state_vector(state: &[Value]) -> Option<Self> {
        let longitude = state.get(position::LONGITUDE)?.as_f64()?;
        let latitude = state.get(position::LATITUDE)?.as_f64()?;
        let icao24 = state.get(position::ICAO24)?.as_str()?.to_string();

        let callsign = state
            .get(position::CALLSIGN)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        let origin_country = state
            .get(position::ORIGIN_COUNTRY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            id: None,
            icao24,
            callsign,
            origin_country,
            longitude,
            latitude,
            altitude: number_or_zero(state.get(position::ALTITUDE)),
            velocity: number_or_zero(state.get(position::VELOCITY)),
            heading: number_or_zero(state.get(position::HEADING)),
            on_ground: truthy(state.get(position::ON_GROUND)),
            timestamp: state
                .get(position::TIMESTAMP)
                .and_then(Value::as_i64)
                .unwrap_or(0),
        })
    }

    /// Observation time as a UTC datetime, if the timestamp is representable.
    #[must_use]
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }

    /// The callsign, or the icao24 identifier when no callsign was reported.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.icao24)
    }
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(0.0)
}

/// The upstream flag is a JSON boolean, but some mirrors encode it as 0/1.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}
