//! Control loop tuning.
//!
//! # Example
//!
//! ```
//! use fogger_core::ControlOptions;
//! use time::UtcOffset;
//!
//! let options = ControlOptions::default()
//!     .threshold(38.5)
//!     .utc_offset(UtcOffset::from_hms(5, 30, 0).unwrap());
//! assert_eq!(options.threshold, 38.5);
//! ```

use std::time::Duration;

use time::UtcOffset;

/// Temperature (°C) at or above which the motor starts automatically.
pub const DEFAULT_HOT_THRESHOLD: f64 = 40.0;

/// Default sampling period of the scheduler.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Temperature shown on events recorded before the first reading arrives.
pub const STARTUP_TEMPERATURE: f64 = 32.0;

/// Humidity shown on events recorded before the first reading arrives.
pub const STARTUP_HUMIDITY: f64 = 65.0;

/// Options for a [`ControlLoop`](crate::ControlLoop).
#[derive(Debug, Clone, PartialEq)]
pub struct ControlOptions {
    /// Hot threshold in °C.
    pub threshold: f64,
    /// Offset used to render event date/time labels.
    pub utc_offset: UtcOffset,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HOT_THRESHOLD,
            utc_offset: UtcOffset::UTC,
        }
    }
}

impl ControlOptions {
    /// Set the hot threshold.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the offset used for event labels.
    pub fn utc_offset(mut self, offset: UtcOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Whether `temperature` counts as hot.
    pub fn is_hot(&self, temperature: f64) -> bool {
        temperature >= self.threshold
    }
}
