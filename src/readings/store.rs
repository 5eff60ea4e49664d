use std::{cmp::Reverse, collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::ReadingStore;
use crate::db::models::{NewReading, Reading};

#[derive(Default)]
struct Inner {
    by_location: HashMap<i64, Vec<Reading>>,
    next_id: i64,
    unavailable: bool,
    stalled: bool,
}

/// In-process [`ReadingStore`] holding readings per location.
///
/// Wrapped in `Arc` so clones share the same data. Can be switched into an
/// unavailable state where every read fails like a closed connection pool,
/// or a stalled one where reads never complete.
#[derive(Clone, Default)]
pub struct MemoryReadingStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `reading` with the given creation time and a fresh id.
    pub async fn insert(&self, reading: NewReading, created_at: DateTime<Utc>) -> Reading {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let stored = Reading {
            id: inner.next_id,
            created_at,
            location_id: reading.location_id,
            co2: reading.co2,
            temperature: reading.temperature,
            humidity: reading.humidity,
        };
        inner
            .by_location
            .entry(stored.location_id)
            .or_default()
            .push(stored.clone());
        stored
    }

    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().await.unavailable = unavailable;
    }

    pub async fn set_stalled(&self, stalled: bool) {
        self.inner.write().await.stalled = stalled;
    }

    async fn newest_first<F>(&self, location_id: i64, keep: F) -> Result<Vec<Reading>, sqlx::Error>
    where
        F: Fn(&Reading) -> bool,
    {
        let stalled = self.inner.read().await.stalled;
        if stalled {
            std::future::pending::<()>().await;
        }
        let inner = self.inner.read().await;
        if inner.unavailable {
            return Err(sqlx::Error::PoolClosed);
        }
        let mut rows: Vec<Reading> = inner
            .by_location
            .get(&location_id)
            .map(|rows| rows.iter().filter(|r| keep(r)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by_key(|r| Reverse((r.created_at, r.id)));
        Ok(rows)
    }
}

impl ReadingStore for MemoryReadingStore {
    async fn readings_since(
        &self,
        location_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        self.newest_first(location_id, |r| r.created_at >= since).await
    }

    async fn most_recent_reading(&self, location_id: i64) -> Result<Option<Reading>, sqlx::Error> {
        let rows = self.newest_first(location_id, |_| true).await?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sample(location_id: i64, co2: i32) -> NewReading {
        NewReading {
            location_id,
            co2,
            temperature: 21.5,
            humidity: 40,
        }
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = MemoryReadingStore::new();
        assert!(store.readings_since(1, Utc::now()).await.unwrap().is_empty());
        assert!(store.most_recent_reading(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryReadingStore::new();
        let a = store.insert(sample(1, 400), Utc::now()).await;
        let b = store.insert(sample(2, 500), Utc::now()).await;
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn identical_timestamps_are_ordered_by_id() {
        let store = MemoryReadingStore::new();
        let at = Utc::now() - Duration::minutes(5);
        let first = store.insert(sample(1, 400), at).await;
        let second = store.insert(sample(1, 410), at).await;

        let rows = store.readings_since(1, at).await.unwrap();
        assert_eq!(rows, vec![second.clone(), first]);
        assert_eq!(store.readings_since(1, at).await.unwrap(), rows);
        assert_eq!(store.most_recent_reading(1).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryReadingStore::new();
        let clone = store.clone();
        store.insert(sample(3, 800), Utc::now()).await;
        assert_eq!(clone.most_recent_reading(3).await.unwrap().unwrap().co2, 800);
    }

    #[tokio::test]
    async fn stalled_store_never_answers() {
        let store = MemoryReadingStore::new();
        store.set_stalled(true).await;
        let read = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            store.most_recent_reading(1),
        )
        .await;
        assert!(read.is_err());
    }

    #[tokio::test]
    async fn unavailable_store_fails_reads() {
        let store = MemoryReadingStore::new();
        store.set_unavailable(true).await;
        assert!(matches!(
            store.most_recent_reading(1).await,
            Err(sqlx::Error::PoolClosed)
        ));
        store.set_unavailable(false).await;
        assert!(store.most_recent_reading(1).await.is_ok());
    }
}
