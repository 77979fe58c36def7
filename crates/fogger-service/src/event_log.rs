//! SQLite-backed [`EventLog`].

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use fogger_core::{EventLog, StorageError, clamp_limit};
use fogger_store::{EventQuery, Store};
use fogger_types::{HistoryEvent, StoredEvent};

/// Event log persisted through a single SQLite connection.
///
/// The connection is behind one mutex so every write, listing and clear is
/// serialized. API handlers borrow the same store via [`SqliteEventLog::store`].
#[derive(Debug)]
pub struct SqliteEventLog {
    store: Mutex<Store>,
}

impl SqliteEventLog {
    /// Wrap an open store.
    pub fn new(store: Store) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Mutex<Store> {
        &self.store
    }
}

#[async_trait]
impl EventLog for SqliteEventLog {
    async fn save(&self, event: &HistoryEvent) -> Result<StoredEvent, StorageError> {
        let store = self.store.lock().await;
        let id = store
            .insert_event(event)
            .map_err(StorageError::unavailable)?;
        Ok(StoredEvent {
            id,
            event: event.clone(),
        })
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>, StorageError> {
        let limit = u32::try_from(clamp_limit(limit)).unwrap_or(u32::MAX);
        let store = self.store.lock().await;
        store
            .query_events(&EventQuery::new().limit(limit))
            .map_err(StorageError::unavailable)
    }

    async fn count(&self) -> Result<u64, StorageError> {
        let store = self.store.lock().await;
        store.count_events().map_err(StorageError::unavailable)
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let store = self.store.lock().await;
        let removed = store.clear_events().map_err(StorageError::unavailable)?;
        debug!("Event log cleared ({} removed)", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogger_types::{MotorStatus, SensorReading};
    use time::OffsetDateTime;

    fn event(status: MotorStatus) -> HistoryEvent {
        let now = OffsetDateTime::now_utc();
        HistoryEvent::new(status, &SensorReading::new(41.0, 60.0, now), "-", "test", now)
    }

    #[tokio::test]
    async fn test_save_list_count_clear() {
        let log = SqliteEventLog::new(Store::open_in_memory().unwrap());

        let first = log.save(&event(MotorStatus::On)).await.unwrap();
        let second = log.save(&event(MotorStatus::Off)).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let listed = log.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], second);

        assert_eq!(log.count().await.unwrap(), 2);
        assert_eq!(log.clear().await.unwrap(), 2);
        assert_eq!(log.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_after_save_is_visible() {
        let log = SqliteEventLog::new(Store::open_in_memory().unwrap());
        for _ in 0..5 {
            log.save(&event(MotorStatus::On)).await.unwrap();
            let count = log.count().await.unwrap();
            assert_eq!(log.list(usize::MAX).await.unwrap().len() as u64, count);
        }
    }
}
