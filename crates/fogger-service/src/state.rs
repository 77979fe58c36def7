//! Application state shared across handlers.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use fogger_core::ControlHandle;

use crate::config::Config;
use crate::event_log::SqliteEventLog;

/// Shared application state.
pub struct AppState {
    /// The persisted event log, also used for API queries.
    pub events: Arc<SqliteEventLog>,
    /// Handle to the running control loop.
    pub control: ControlHandle,
    /// Configuration as loaded at startup.
    pub config: RwLock<Config>,
    /// When the service started.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Create new application state.
    pub fn new(events: Arc<SqliteEventLog>, control: ControlHandle, config: Config) -> Arc<Self> {
        Arc::new(Self {
            events,
            control,
            config: RwLock::new(config),
            started_at: OffsetDateTime::now_utc(),
        })
    }

    /// Seconds since the service started.
    pub fn uptime_secs(&self) -> i64 {
        (OffsetDateTime::now_utc() - self.started_at).whole_seconds()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("control", &self.control)
            .field("started_at", &self.started_at)
            .finish()
    }
}
