//! Main store implementation.

use std::io::Write;
use std::path::Path;

use rusqlite::{Connection, Row};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info};

use fogger_types::{HistoryEvent, MotorStatus, StoredEvent};

use crate::error::{Error, Result};
use crate::queries::EventQuery;
use crate::schema;

/// Header row written by [`Store::export_csv`].
pub const CSV_HEADER: [&str; 9] = [
    "id",
    "status",
    "temperature",
    "humidity",
    "duration",
    "reason",
    "date",
    "time",
    "created_at",
];

/// SQLite-based store for motor history events.
pub struct Store {
    conn: Connection,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Event operations
impl Store {
    /// Append an event, returning its id.
    ///
    /// `created_at` is stored with whole-second precision.
    pub fn insert_event(&self, event: &HistoryEvent) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO history (status, temperature, humidity, duration, reason,
             date, time, created_at, utc_offset)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            rusqlite::params![
                event.status.as_str(),
                event.temperature,
                event.humidity,
                &event.duration_label,
                &event.reason,
                &event.date,
                &event.time,
                event.created_at.unix_timestamp(),
                event.created_at.offset().whole_seconds(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted {} event #{}", event.status, id);
        Ok(id)
    }

    /// Query events with filters.
    pub fn query_events(&self, query: &EventQuery) -> Result<Vec<StoredEvent>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_ref.as_slice(), EventRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(EventRow::into_stored).collect()
    }

    /// The most recent event, if any.
    pub fn latest_event(&self) -> Result<Option<StoredEvent>> {
        let mut events = self.query_events(&EventQuery::new().limit(1))?;
        Ok(events.pop())
    }

    /// Count all events.
    pub fn count_events(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Count events with the given status.
    pub fn count_events_by_status(&self, status: MotorStatus) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM history WHERE status = ?",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Delete every event, returning how many were removed.
    ///
    /// Ids are not reused afterwards.
    pub fn clear_events(&self) -> Result<u64> {
        let removed = self.conn.execute("DELETE FROM history", [])?;
        info!("Cleared {} event(s)", removed);
        Ok(removed as u64)
    }

    /// Write the events matched by `query` as CSV, returning the row count.
    ///
    /// Columns follow [`CSV_HEADER`]; `created_at` is RFC 3339.
    pub fn export_csv<W: Write>(&self, writer: W, query: &EventQuery) -> Result<usize> {
        let events = self.query_events(query)?;
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(CSV_HEADER)?;

        for stored in &events {
            let event = &stored.event;
            let created_at = event
                .created_at
                .format(&Rfc3339)
                .map_err(|e| Error::CorruptEvent {
                    id: stored.id,
                    reason: e.to_string(),
                })?;
            csv.write_record([
                stored.id.to_string(),
                event.status.to_string(),
                event.temperature.to_string(),
                event.humidity.to_string(),
                event.duration_label.clone(),
                event.reason.clone(),
                event.date.clone(),
                event.time.clone(),
                created_at,
            ])?;
        }

        csv.flush()?;
        Ok(events.len())
    }
}

/// Raw columns of one `history` row.
struct EventRow {
    id: i64,
    status: String,
    temperature: f64,
    humidity: f64,
    duration: String,
    reason: String,
    date: String,
    time: String,
    created_at: i64,
    utc_offset: i32,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            temperature: row.get(2)?,
            humidity: row.get(3)?,
            duration: row.get(4)?,
            reason: row.get(5)?,
            date: row.get(6)?,
            time: row.get(7)?,
            created_at: row.get(8)?,
            utc_offset: row.get(9)?,
        })
    }

    fn into_stored(self) -> Result<StoredEvent> {
        let id = self.id;
        let corrupt = |reason: String| Error::CorruptEvent { id, reason };

        let status: MotorStatus = self.status.parse().map_err(|e| corrupt(format!("{e}")))?;
        let offset =
            UtcOffset::from_whole_seconds(self.utc_offset).map_err(|e| corrupt(e.to_string()))?;
        let created_at = OffsetDateTime::from_unix_timestamp(self.created_at)
            .map_err(|e| corrupt(e.to_string()))?
            .to_offset(offset);

        Ok(StoredEvent {
            id,
            event: HistoryEvent {
                status,
                temperature: self.temperature,
                humidity: self.humidity,
                duration_label: self.duration,
                reason: self.reason,
                date: self.date,
                time: self.time,
                created_at,
            },
        })
    }
}
