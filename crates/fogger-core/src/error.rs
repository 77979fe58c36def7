//! Error types for fogger-core.
//!
//! The control loop never panics or propagates failures into the
//! scheduler. Every problem is reported as a value:
//!
//! | Error | Cause | State change | Log entry |
//! |-------|-------|--------------|-----------|
//! | [`ControlError::InvalidToggle`] | Toggle into the mode already held | none | none |
//! | [`ControlError::StorageUnavailable`] | Event log write failed | applied | missing |
//! | [`ControlError::SensorFault`] | Reading could not be produced | none | none |
//!
//! `StorageUnavailable` carries the transition that was applied in memory so
//! an operator can reconcile the log against the motor's real state.

use thiserror::Error;

use fogger_types::MotorMode;

use crate::control::{ToggleRequest, Transition};

/// A reading source could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Sensor fault: {message}")]
pub struct SensorFault {
    /// Description of the fault.
    pub message: String,
}

impl SensorFault {
    /// Create a new sensor fault.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The event log could not be reached.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The backing store is unavailable.
    #[error("Event log unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Wrap any displayable store error.
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

/// Errors reported by the control loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControlError {
    /// The requested toggle does not apply to the current mode.
    #[error("Invalid toggle: cannot switch {requested} while motor is {mode}")]
    InvalidToggle {
        /// Mode held when the request arrived.
        mode: MotorMode,
        /// What the caller asked for.
        requested: ToggleRequest,
    },

    /// The transition was applied but its event could not be logged.
    #[error("Motor is now {} but the event was not logged: {source}", .transition.to)]
    StorageUnavailable {
        /// The transition applied in memory.
        transition: Box<Transition>,
        /// The underlying storage failure.
        source: StorageError,
    },

    /// The tick was skipped because no valid reading was available.
    #[error(transparent)]
    SensorFault(#[from] SensorFault),
}

impl ControlError {
    /// The transition applied in memory, if any.
    ///
    /// Only [`ControlError::StorageUnavailable`] carries one.
    pub fn applied_transition(&self) -> Option<&Transition> {
        match self {
            ControlError::StorageUnavailable { transition, .. } => Some(transition),
            _ => None,
        }
    }
}

/// Errors reported through a [`ControlHandle`](crate::ControlHandle).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler has shut down and no longer accepts commands.
    #[error("Controller is shut down")]
    Closed,

    /// The command reached the control loop and was reported back.
    #[error(transparent)]
    Control(#[from] ControlError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_fault_display() {
        let fault = SensorFault::new("probe disconnected");
        assert_eq!(fault.to_string(), "Sensor fault: probe disconnected");
    }

    #[test]
    fn test_storage_error_unavailable() {
        let err = StorageError::unavailable("disk I/O error");
        assert_eq!(err, StorageError::Unavailable("disk I/O error".to_string()));
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn test_invalid_toggle_display() {
        let err = ControlError::InvalidToggle {
            mode: MotorMode::ManualOn,
            requested: ToggleRequest::On,
        };
        let display = err.to_string();
        assert!(display.contains("on"));
        assert!(display.contains("Manual On"));
        assert!(err.applied_transition().is_none());
    }

    #[test]
    fn test_sensor_fault_converts() {
        let err: ControlError = SensorFault::new("timeout").into();
        assert!(matches!(err, ControlError::SensorFault(_)));

        let err: SchedulerError = err.into();
        assert!(err.to_string().contains("timeout"));
    }
}
