//! Platform-agnostic types for the fogging motor controller.
//!
//! This crate provides the data model shared by the control core
//! (fogger-core), the event store (fogger-store) and the service.
//!
//! # Features
//!
//! - Sensor readings and motor modes
//! - History events as persisted in the event log
//! - Controller snapshots for presentation layers
//! - Duration and date/time label formatting
//!
//! # Example
//!
//! ```
//! use fogger_types::{HistoryEvent, MotorStatus, SensorReading};
//!
//! let reading = SensorReading::now(41.0, 60.2);
//! let event = HistoryEvent::new(
//!     MotorStatus::On,
//!     &reading,
//!     "-",
//!     "Auto ON - Temperature 41.0 Hot",
//!     reading.timestamp,
//! );
//! assert!(!event.has_duration());
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    ControlSnapshot, DURATION_PLACEHOLDER, HistoryEvent, MotorMode, MotorStatus, SensorReading,
    StoredEvent, date_label, format_duration, time_label,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    // --- Duration formatting ---

    #[test]
    fn test_format_duration_minutes_and_seconds() {
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "60m 0s");
    }

    #[test]
    fn test_format_duration_truncates_fractional_seconds() {
        assert_eq!(format_duration(Duration::from_millis(999)), "0m 0s");
        assert_eq!(format_duration(Duration::from_millis(61_500)), "1m 1s");
    }

    // --- Labels ---

    #[test]
    fn test_date_label() {
        assert_eq!(date_label(datetime!(2026-10-19 15:07:00 UTC)), "19 Oct 2026");
        assert_eq!(date_label(datetime!(2025-03-02 00:00:00 UTC)), "02 Mar 2025");
    }

    #[test]
    fn test_time_label_twelve_hour_clock() {
        assert_eq!(time_label(datetime!(2026-10-19 15:07:00 UTC)), "03:07 PM");
        assert_eq!(time_label(datetime!(2026-10-19 00:05:00 UTC)), "12:05 AM");
        assert_eq!(time_label(datetime!(2026-10-19 12:00:00 UTC)), "12:00 PM");
        assert_eq!(time_label(datetime!(2026-10-19 09:30:00 UTC)), "09:30 AM");
    }

    #[test]
    fn test_labels_use_event_offset() {
        let at = datetime!(2026-10-19 23:30:00 +05:30);
        assert_eq!(date_label(at), "19 Oct 2026");
        assert_eq!(time_label(at), "11:30 PM");
    }

    // --- MotorMode / MotorStatus ---

    #[test]
    fn test_motor_mode_default_is_off() {
        assert_eq!(MotorMode::default(), MotorMode::Off);
        assert!(!MotorMode::Off.is_running());
        assert!(MotorMode::AutoOn.is_running());
        assert!(MotorMode::ManualOn.is_running());
    }

    #[test]
    fn test_motor_mode_status() {
        assert_eq!(MotorMode::Off.status(), MotorStatus::Off);
        assert_eq!(MotorMode::AutoOn.status(), MotorStatus::On);
        assert_eq!(MotorMode::ManualOn.status(), MotorStatus::On);
    }

    #[test]
    fn test_motor_status_parse() {
        assert_eq!("ON".parse::<MotorStatus>(), Ok(MotorStatus::On));
        assert_eq!("Off".parse::<MotorStatus>(), Ok(MotorStatus::Off));

        let err = "maybe".parse::<MotorStatus>().unwrap_err();
        assert_eq!(err, ParseError::InvalidStatus("maybe".to_string()));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_motor_status_display_matches_storage() {
        assert_eq!(MotorStatus::On.to_string(), "ON");
        assert_eq!(MotorStatus::Off.to_string(), MotorStatus::Off.as_str());
    }

    // --- SensorReading ---

    #[test]
    fn test_sensor_reading_try_new_rejects_nan() {
        let now = datetime!(2026-10-19 10:00:00 UTC);
        assert!(SensorReading::try_new(f64::NAN, 50.0, now).is_err());
        assert!(SensorReading::try_new(30.0, f64::INFINITY, now).is_err());

        let reading = SensorReading::try_new(30.0, 50.0, now).unwrap();
        assert_eq!(reading.timestamp, now);
    }

    // --- HistoryEvent ---

    #[test]
    fn test_history_event_new_copies_reading() {
        let at = datetime!(2026-10-19 15:07:42 UTC);
        let reading = SensorReading::new(41.0, 62.5, at);
        let event = HistoryEvent::new(MotorStatus::Off, &reading, "2m 5s", "Manual Stop", at);

        assert_eq!(event.status, MotorStatus::Off);
        assert_eq!(event.temperature, 41.0);
        assert_eq!(event.humidity, 62.5);
        assert_eq!(event.date, "19 Oct 2026");
        assert_eq!(event.time, "03:07 PM");
        assert!(event.has_duration());
    }

    #[test]
    fn test_history_event_serialization_uses_stored_names() {
        let at = datetime!(2026-10-19 15:07:42 UTC);
        let reading = SensorReading::new(41.0, 62.5, at);
        let event = HistoryEvent::new(MotorStatus::On, &reading, DURATION_PLACEHOLDER, "Manual Start", at);
        let stored = StoredEvent { id: 7, event };

        let json: serde_json::Value = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["status"], "ON");
        assert_eq!(json["duration"], "-");
        assert_eq!(json["reason"], "Manual Start");
        assert_eq!(json["created_at"], "2026-10-19T15:07:42Z");
    }

    #[test]
    fn test_history_event_truncates_to_whole_seconds() {
        let at = datetime!(2026-10-19 15:07:42.713 +05:30);
        let reading = SensorReading::new(41.0, 62.5, at);
        let event = HistoryEvent::new(MotorStatus::On, &reading, DURATION_PLACEHOLDER, "Manual Start", at);

        assert_eq!(event.created_at, datetime!(2026-10-19 15:07:42 +05:30));
        assert_eq!(event.created_at.offset(), at.offset());
        assert_eq!(event.time, "03:07 PM");
    }

    // --- ControlSnapshot ---

    #[test]
    fn test_control_snapshot_serialization() {
        let snapshot = ControlSnapshot {
            mode: MotorMode::ManualOn,
            temperature: Some(38.5),
            humidity: None,
            last_event: None,
            unpersisted_events: 2,
            updated_at: datetime!(2026-10-19 10:00:00 UTC),
        };
        assert!(snapshot.motor_running());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["mode"], "manual_on");
        assert_eq!(json["temperature"], 38.5);
        assert!(json["humidity"].is_null());
        assert_eq!(json["unpersisted_events"], 2);
        assert_eq!(json["updated_at"], "2026-10-19T10:00:00Z");
    }
}
