pub mod service;
#[cfg(test)]
mod store;

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::db::models::Reading;

pub use service::{QueryError, TimeFrameQuery, STORE_TIMEOUT};
#[cfg(test)]
pub(crate) use store::MemoryReadingStore;

/// Read access to stored readings.
///
/// "No rows" is reported as an empty `Vec` / `None`; `Err` is reserved for
/// connectivity and query failures.
pub trait ReadingStore: Send + Sync {
    /// Readings for `location_id` created at or after `since`, newest first,
    /// ties broken by `id` descending.
    fn readings_since(
        &self,
        location_id: i64,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Reading>, sqlx::Error>> + Send;

    fn most_recent_reading(
        &self,
        location_id: i64,
    ) -> impl Future<Output = Result<Option<Reading>, sqlx::Error>> + Send;
}
