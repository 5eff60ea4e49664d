use std::{future::Future, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use super::ReadingStore;
use crate::db::models::Reading;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no reading found for location {0}")]
    NotFound(i64),
    #[error("reading store failed: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Longest a single store round-trip may take before it is abandoned.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(3);

/// Time-windowed reads over a [`ReadingStore`]. Holds no state of its own;
/// every call is a single store round-trip bounded by a timeout.
#[derive(Debug, Clone)]
pub struct TimeFrameQuery<S> {
    store: S,
    timeout: Duration,
}

impl<S: ReadingStore> TimeFrameQuery<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: STORE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// All readings for `location_id` created within the last `duration`,
    /// newest first. An empty window is not an error.
    pub async fn fetch_window(
        &self,
        location_id: i64,
        duration: Duration,
    ) -> Result<Vec<Reading>, QueryError> {
        let since = window_start(Utc::now(), duration);
        let rows = self.bounded(self.store.readings_since(location_id, since)).await?;
        debug!(location_id, since = %since, count = rows.len(), "Fetched readings in time frame");
        Ok(rows)
    }

    /// The most recent reading for `location_id`.
    pub async fn fetch_latest(&self, location_id: i64) -> Result<Reading, QueryError> {
        self.bounded(self.store.most_recent_reading(location_id))
            .await?
            .ok_or(QueryError::NotFound(location_id))
    }

    /// An expired timeout is reported as a storage failure (`io::ErrorKind::TimedOut`).
    async fn bounded<T>(
        &self,
        op: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, QueryError> {
        match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => Ok(result?),
            Err(elapsed) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Reading store timed out");
                Err(sqlx::Error::Io(elapsed.into()).into())
            }
        }
    }
}

/// `now - duration`, floored at the Unix epoch so that very large windows
/// stay representable in the database.
pub fn window_start(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |since| since.max(DateTime::<Utc>::UNIX_EPOCH))
}
