use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One sensor sample. Rows in `co2_data` are never updated or deleted.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub location_id: i64,
    /// Parts per million
    pub co2: i32,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: i32,
}

/// Column values for a reading that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub location_id: i64,
    pub co2: i32,
    pub temperature: f64,
    pub humidity: i32,
}
