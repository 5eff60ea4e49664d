use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{Location, NewReading, Reading};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationDto {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Location> for LocationDto {
    fn from(l: Location) -> Self {
        Self {
            id: l.id,
            name: l.name,
            created_at: l.created_at,
            updated_at: l.updated_at,
        }
    }
}

/// Request item for `POST /api/location/new`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewLocationDto {
    /// Unique, 3 to 500 bytes.
    pub name: String,
}

/// Request body for `PATCH /api/location/{id}`. Absent fields keep their
/// current value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLocationDto {
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
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

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            created_at: r.created_at,
            location_id: r.location_id,
            co2: r.co2,
            temperature: r.temperature,
            humidity: r.humidity,
        }
    }
}

/// Request item for `POST /api/co2data/new`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NewReadingDto {
    pub location_id: i64,
    /// Parts per million, `0 <= co2 < 5000`.
    pub co2: i32,
    /// Degrees Celsius, `-100 <= temperature <= 100`.
    pub temperature: f64,
    /// Percent, `0 <= humidity <= 100`.
    pub humidity: i32,
}

impl From<NewReadingDto> for NewReading {
    fn from(r: NewReadingDto) -> Self {
        Self {
            location_id: r.location_id,
            co2: r.co2,
            temperature: r.temperature,
            humidity: r.humidity,
        }
    }
}
