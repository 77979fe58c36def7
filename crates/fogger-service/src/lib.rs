//! Background controller and HTTP REST API for a fogging motor.
//!
//! This crate provides a service that:
//! - Samples a temperature source on a fixed period
//! - Starts and stops the motor automatically around a hot threshold
//! - Accepts manual overrides from an operator
//! - Persists every motor state change to a local SQLite event log
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `GET /api/status` - Current mode, last reading and last event
//! - `POST /api/motor/on` - Manual start
//! - `POST /api/motor/off` - Manual stop
//! - `POST /api/motor/toggle` - Flip between running and stopped
//! - `GET /api/events` - Query the event log with filters
//! - `GET /api/events/count` - Event totals by status
//! - `GET /api/events/export` - Event log as CSV
//! - `DELETE /api/events` - Clear the event log
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/fogger/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/fogger/events.db"
//!
//! [control]
//! threshold = 40.0
//! tick_interval_secs = 5
//! utc_offset_minutes = 330
//!
//! [sensor]
//! seed = 42
//! temperature_min = 20.0
//! temperature_max = 45.0
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod event_log;
pub mod state;

pub use config::{
    Config, ConfigError, ControlConfig, SensorConfig, ServerConfig, StorageConfig,
    ValidationError,
};
pub use event_log::SqliteEventLog;
pub use state::AppState;
