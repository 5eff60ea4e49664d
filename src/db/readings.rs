use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::models::{NewReading, Reading};
use crate::readings::ReadingStore;

/// [`ReadingStore`] backed by the `co2_data` table.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReadingStore for PgReadingStore {
    async fn readings_since(
        &self,
        location_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, created_at, location_id, co2, temperature, humidity
            FROM co2_data
            WHERE location_id = $1
              AND created_at >= $2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(location_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }

    async fn most_recent_reading(&self, location_id: i64) -> Result<Option<Reading>, sqlx::Error> {
        sqlx::query_as::<_, Reading>(
            r#"
            SELECT id, created_at, location_id, co2, temperature, humidity
            FROM co2_data
            WHERE location_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Insert every reading in one transaction; a single bad `location_id` rolls
/// back the whole batch.
pub async fn insert_many(pool: &PgPool, readings: &[NewReading]) -> Result<Vec<Reading>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(readings.len());

    for r in readings {
        let reading = sqlx::query_as::<_, Reading>(
            r#"
            INSERT INTO co2_data (location_id, co2, temperature, humidity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at, location_id, co2, temperature, humidity
            "#,
        )
        .bind(r.location_id)
        .bind(r.co2)
        .bind(r.temperature)
        .bind(r.humidity)
        .fetch_one(&mut *tx)
        .await?;
        created.push(reading);
    }

    tx.commit().await?;
    Ok(created)
}
