//! Core types for fogger controller data.

use core::fmt;
use core::str::FromStr;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{ParseError, ParseResult};

/// Duration label recorded on events that have no measured duration.
pub const DURATION_PLACEHOLDER: &str = "-";

/// A single temperature/humidity sample.
///
/// Readings are immutable and produced fresh on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// When the sample was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl SensorReading {
    /// Create a reading taken at `timestamp`.
    pub fn new(temperature: f64, humidity: f64, timestamp: OffsetDateTime) -> Self {
        Self {
            temperature,
            humidity,
            timestamp,
        }
    }

    /// Create a reading stamped with the current UTC time.
    pub fn now(temperature: f64, humidity: f64) -> Self {
        Self::new(temperature, humidity, OffsetDateTime::now_utc())
    }

    /// Create a reading, rejecting non-finite values.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidValue`] if either value is NaN or infinite.
    pub fn try_new(temperature: f64, humidity: f64, timestamp: OffsetDateTime) -> ParseResult<Self> {
        if !temperature.is_finite() {
            return Err(ParseError::InvalidValue(format!(
                "temperature {temperature} is not a finite number"
            )));
        }
        if !humidity.is_finite() {
            return Err(ParseError::InvalidValue(format!(
                "humidity {humidity} is not a finite number"
            )));
        }
        Ok(Self::new(temperature, humidity, timestamp))
    }
}

/// Operating mode of the fogging motor.
///
/// Exactly one mode holds at any time. `ManualOn` suspends all
/// sensor-driven transitions until the operator releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MotorMode {
    /// Motor stopped.
    #[default]
    Off,
    /// Motor started by a hot reading.
    AutoOn,
    /// Motor started by an operator.
    ManualOn,
}

impl MotorMode {
    /// Whether the motor is physically running in this mode.
    pub fn is_running(&self) -> bool {
        matches!(self, MotorMode::AutoOn | MotorMode::ManualOn)
    }

    /// Status recorded for a transition into this mode.
    pub fn status(&self) -> MotorStatus {
        if self.is_running() {
            MotorStatus::On
        } else {
            MotorStatus::Off
        }
    }
}

impl fmt::Display for MotorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorMode::Off => write!(f, "Off"),
            MotorMode::AutoOn => write!(f, "Auto On"),
            MotorMode::ManualOn => write!(f, "Manual On"),
        }
    }
}

/// Persisted motor status of a history event.
///
/// Serialized and stored as `"ON"` / `"OFF"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotorStatus {
    /// The motor was started.
    #[cfg_attr(feature = "serde", serde(rename = "ON"))]
    On,
    /// The motor was stopped.
    #[cfg_attr(feature = "serde", serde(rename = "OFF"))]
    Off,
}

impl MotorStatus {
    /// The stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MotorStatus::On => "ON",
            MotorStatus::Off => "OFF",
        }
    }
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MotorStatus {
    type Err = ParseError;

    /// Parse a stored status. Matching is case-insensitive.
    ///
    /// ```
    /// use fogger_types::MotorStatus;
    ///
    /// assert_eq!("ON".parse::<MotorStatus>(), Ok(MotorStatus::On));
    /// assert_eq!("off".parse::<MotorStatus>(), Ok(MotorStatus::Off));
    /// assert!("RUNNING".parse::<MotorStatus>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("on") {
            Ok(MotorStatus::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(MotorStatus::Off)
        } else {
            Err(ParseError::InvalidStatus(s.to_string()))
        }
    }
}

/// One recorded motor state change.
///
/// Events are immutable once created and are only ever appended to the
/// event log. `date` and `time` are human labels rendered from `created_at`
/// at creation time; `created_at` is the sortable timestamp.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryEvent {
    /// Whether the motor started or stopped.
    pub status: MotorStatus,
    /// Temperature at the time of the change.
    pub temperature: f64,
    /// Humidity at the time of the change.
    pub humidity: f64,
    /// Run duration (`"2m 5s"`), or [`DURATION_PLACEHOLDER`].
    #[cfg_attr(feature = "serde", serde(rename = "duration"))]
    pub duration_label: String,
    /// Why the change happened.
    pub reason: String,
    /// Date label, e.g. `19 Oct 2026`.
    pub date: String,
    /// Time label, e.g. `03:07 PM`.
    pub time: String,
    /// Creation timestamp.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

impl HistoryEvent {
    /// Build an event from the reading that accompanied the transition.
    ///
    /// The date and time labels are rendered in `created_at`'s own offset.
    /// `created_at` is truncated to whole seconds, the precision of the
    /// event log.
    pub fn new(
        status: MotorStatus,
        reading: &SensorReading,
        duration_label: impl Into<String>,
        reason: impl Into<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        let created_at = created_at.replace_nanosecond(0).unwrap_or(created_at);
        Self {
            status,
            temperature: reading.temperature,
            humidity: reading.humidity,
            duration_label: duration_label.into(),
            reason: reason.into(),
            date: date_label(created_at),
            time: time_label(created_at),
            created_at,
        }
    }

    /// Whether the event carries a measured duration.
    pub fn has_duration(&self) -> bool {
        self.duration_label != DURATION_PLACEHOLDER
    }
}

/// A history event together with the id assigned by the store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoredEvent {
    /// Monotonic id assigned on insert.
    pub id: i64,
    /// The event itself.
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub event: HistoryEvent,
}

/// Read-only view of the controller for presentation layers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlSnapshot {
    /// Current motor mode.
    pub mode: MotorMode,
    /// Most recent temperature, if any reading was taken yet.
    pub temperature: Option<f64>,
    /// Most recent humidity, if any reading was taken yet.
    pub humidity: Option<f64>,
    /// The last transition, whether or not it reached the log.
    pub last_event: Option<HistoryEvent>,
    /// Transitions whose log write failed since startup.
    pub unpersisted_events: u64,
    /// When this snapshot was published.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub updated_at: OffsetDateTime,
}

impl ControlSnapshot {
    /// Whether the motor is running.
    pub fn motor_running(&self) -> bool {
        self.mode.is_running()
    }
}

/// Format a run duration as whole minutes and remaining whole seconds.
///
/// ```
/// use std::time::Duration;
/// use fogger_types::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
/// assert_eq!(format_duration(Duration::from_millis(59_900)), "0m 59s");
/// ```
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}

const DATE_LABEL: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year]");

const TIME_LABEL: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12]:[minute] [period]");

/// Render a date label such as `19 Oct 2026`.
pub fn date_label(at: OffsetDateTime) -> String {
    at.format(DATE_LABEL)
        .unwrap_or_else(|_| DURATION_PLACEHOLDER.to_string())
}

/// Render a 12-hour time label such as `03:07 PM`.
pub fn time_label(at: OffsetDateTime) -> String {
    at.format(TIME_LABEL)
        .unwrap_or_else(|_| DURATION_PLACEHOLDER.to_string())
}
