//! Event log abstraction.
//!
//! This module provides the [`EventLog`] trait that abstracts over the
//! persistent SQLite log and the in-memory log used in tests.

use std::sync::Arc;

use async_trait::async_trait;

use fogger_types::{HistoryEvent, StoredEvent};

use crate::error::StorageError;

/// Upper bound on the number of events returned by a single listing.
pub const MAX_LIST_LIMIT: usize = 50_000;

/// Append-only log of motor state changes.
///
/// Implementations must serialize concurrent writers; the control loop is a
/// single writer, but maintenance callers (listing, clearing) may run
/// concurrently with it. A completed [`save`](EventLog::save) must be
/// visible to every [`list`](EventLog::list) that starts afterwards.
///
/// # Example
///
/// ```
/// use fogger_core::{EventLog, MemoryEventLog};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let log = MemoryEventLog::new();
/// assert_eq!(log.count().await.unwrap(), 0);
/// # }
/// ```
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one event, returning it with its assigned id.
    async fn save(&self, event: &HistoryEvent) -> Result<StoredEvent, StorageError>;

    /// Most recent events, newest first.
    ///
    /// `limit` is clamped to [`MAX_LIST_LIMIT`].
    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>, StorageError>;

    /// Total number of stored events.
    async fn count(&self) -> Result<u64, StorageError>;

    /// Delete every event. Irreversible.
    ///
    /// Returns the number of events removed.
    async fn clear(&self) -> Result<u64, StorageError>;
}

#[async_trait]
impl<T: EventLog + ?Sized> EventLog for Arc<T> {
    async fn save(&self, event: &HistoryEvent) -> Result<StoredEvent, StorageError> {
        (**self).save(event).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>, StorageError> {
        (**self).list(limit).await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        (**self).count().await
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        (**self).clear().await
    }
}

/// Clamp a requested listing size to [`MAX_LIST_LIMIT`].
pub fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_LIST_LIMIT)
}
