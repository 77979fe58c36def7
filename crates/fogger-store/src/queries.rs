//! Query builder for stored events.
//!
//! # Example
//!
//! ```
//! use fogger_store::{EventQuery, Store};
//! use fogger_types::MotorStatus;
//! use time::{Duration, OffsetDateTime};
//!
//! let store = Store::open_in_memory()?;
//! let yesterday = OffsetDateTime::now_utc() - Duration::hours(24);
//!
//! // Motor starts in the last day, 20 per page
//! let query = EventQuery::new()
//!     .status(MotorStatus::On)
//!     .since(yesterday)
//!     .limit(20)
//!     .offset(0);
//!
//! let events = store.query_events(&query)?;
//! # assert!(events.is_empty());
//! # Ok::<(), fogger_store::Error>(())
//! ```

use time::OffsetDateTime;

use fogger_types::MotorStatus;

/// Upper bound on rows returned by one query.
pub const MAX_QUERY_LIMIT: u32 = 50_000;

/// Columns selected by every event query.
pub(crate) const EVENT_COLUMNS: &str =
    "id, status, temperature, humidity, duration, reason, date, time, created_at, utc_offset";

/// Fluent query builder for history events.
///
/// Use this to construct queries for [`Store::query_events`](crate::Store::query_events)
/// and [`Store::export_csv`](crate::Store::export_csv).
///
/// By default, queries return up to [`MAX_QUERY_LIMIT`] events ordered by id
/// descending (newest first).
#[derive(Debug, Default, Clone)]
pub struct EventQuery {
    /// Filter by ON or OFF.
    pub status: Option<MotorStatus>,
    /// Include only events created at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only events created at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results; clamped to [`MAX_QUERY_LIMIT`].
    pub limit: Option<u32>,
    /// Number of results to skip.
    pub offset: Option<u32>,
    /// Order by id descending (newest first).
    pub newest_first: bool,
}

impl EventQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No status or time filter
    /// - At most [`MAX_QUERY_LIMIT`] results
    /// - Ordered by newest first
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Filter by status.
    pub fn status(mut self, status: MotorStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter to events created at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to events created at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    ///
    /// Use with `limit()` for pagination: page 2 with 50 per page is
    /// `.limit(50).offset(50)`.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results oldest first.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// The limit that will actually be applied.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(MAX_QUERY_LIMIT).min(MAX_QUERY_LIMIT)
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = self.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(since) = self.since {
            conditions.push("created_at >= ?");
            params.push(Box::new(since.unix_timestamp()));
        }

        if let Some(until) = self.until {
            conditions.push("created_at <= ?");
            params.push(Box::new(until.unix_timestamp()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT {} FROM history {} ORDER BY id {} LIMIT {}",
            EVENT_COLUMNS,
            where_clause,
            order,
            self.effective_limit()
        );

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}
