//! Local persistence for fogging motor history.
//!
//! This crate provides SQLite-based storage for motor start/stop events,
//! the durable side of the controller's event log.
//!
//! # Features
//!
//! - Append-only `history` table with monotonic ids
//! - Query by status and time range, with pagination
//! - Counts, latest event, bulk clear
//! - CSV export
//!
//! # Example
//!
//! ```no_run
//! use fogger_store::{EventQuery, Store};
//!
//! let store = Store::open_default()?;
//!
//! let recent = store.query_events(&EventQuery::new().limit(10))?;
//! for stored in recent {
//!     println!("#{} {} {}", stored.id, stored.event.status, stored.event.reason);
//! }
//! # Ok::<(), fogger_store::Error>(())
//! ```

mod error;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use queries::{EventQuery, MAX_QUERY_LIMIT};
pub use schema::SCHEMA_VERSION;
pub use store::{CSV_HEADER, Store};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/fogger/events.db`
/// - macOS: `~/Library/Application Support/fogger/events.db`
/// - Windows: `C:\Users\<user>\AppData\Local\fogger\events.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("fogger")
        .join("events.db")
}
