//! Reading sources for the control loop.
//!
//! The [`SensorSource`] trait is the seam between the controller and
//! whatever produces temperatures: a hardware driver, the bundled
//! [`SimulatedSensor`], or a [`ScriptedSensor`](crate::mock::ScriptedSensor)
//! in tests. The control loop assumes nothing about the values beyond
//! "a finite float, refreshed on every call".

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use fogger_types::SensorReading;

use crate::error::SensorFault;

/// Something that produces one reading per tick.
///
/// Implementations must be fast and must not block meaningfully; the
/// scheduler calls [`read`](SensorSource::read) from its own task.
///
/// # Example
///
/// ```
/// use fogger_core::{SensorFault, SensorSource};
/// use fogger_types::SensorReading;
///
/// struct Fixed(f64);
///
/// impl SensorSource for Fixed {
///     fn read(&mut self) -> Result<SensorReading, SensorFault> {
///         Ok(SensorReading::now(self.0, 60.0))
///     }
/// }
///
/// let mut sensor = Fixed(35.5);
/// assert_eq!(sensor.read().unwrap().temperature, 35.5);
/// ```
pub trait SensorSource: Send {
    /// Take one reading.
    fn read(&mut self) -> Result<SensorReading, SensorFault>;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn read(&mut self) -> Result<SensorReading, SensorFault> {
        (**self).read()
    }
}

/// Value ranges sampled by [`SimulatedSensor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedSensorConfig {
    /// Lower bound for temperature (inclusive).
    pub temperature_min: f64,
    /// Upper bound for temperature (exclusive).
    pub temperature_max: f64,
    /// Lower bound for humidity (inclusive).
    pub humidity_min: f64,
    /// Upper bound for humidity (exclusive).
    pub humidity_max: f64,
}

impl Default for SimulatedSensorConfig {
    fn default() -> Self {
        Self {
            temperature_min: 28.0,
            temperature_max: 44.0,
            humidity_min: 55.0,
            humidity_max: 75.0,
        }
    }
}

impl SimulatedSensorConfig {
    /// Check that both ranges are finite and non-empty.
    ///
    /// Reports the first bad range; see [`invalid_ranges`](Self::invalid_ranges)
    /// for all of them.
    pub fn validate(&self) -> Result<(), InvalidRange> {
        match self.invalid_ranges().into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every range that is empty or not finite.
    pub fn invalid_ranges(&self) -> Vec<InvalidRange> {
        [
            check_range("temperature", self.temperature_min, self.temperature_max),
            check_range("humidity", self.humidity_min, self.humidity_max),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect()
    }

    fn temperature(&self) -> Range<f64> {
        self.temperature_min..self.temperature_max
    }

    fn humidity(&self) -> Range<f64> {
        self.humidity_min..self.humidity_max
    }
}

fn check_range(field: &'static str, min: f64, max: f64) -> Result<(), InvalidRange> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(InvalidRange { field, min, max })
    }
}

/// A simulated sensor range was empty or not finite.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {field} range: {min} .. {max} (min must be below max and both finite)")]
pub struct InvalidRange {
    /// Which range was rejected.
    pub field: &'static str,
    /// Configured lower bound.
    pub min: f64,
    /// Configured upper bound.
    pub max: f64,
}

/// Bounded pseudo-random reading generator.
///
/// Temperatures and humidities are sampled uniformly from the configured
/// ranges and rounded to one decimal place, so a value just below the upper
/// bound may round up to it.
///
/// ```
/// use fogger_core::{SensorSource, SimulatedSensor, SimulatedSensorConfig};
///
/// let mut a = SimulatedSensor::seeded(7, SimulatedSensorConfig::default()).unwrap();
/// let mut b = SimulatedSensor::seeded(7, SimulatedSensorConfig::default()).unwrap();
/// assert_eq!(a.read().unwrap().temperature, b.read().unwrap().temperature);
/// ```
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    config: SimulatedSensorConfig,
}

impl SimulatedSensor {
    /// Create a generator seeded from the operating system.
    pub fn new(config: SimulatedSensorConfig) -> Result<Self, InvalidRange> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::from_os_rng(),
            config,
        })
    }

    /// Create a deterministic generator.
    pub fn seeded(seed: u64, config: SimulatedSensorConfig) -> Result<Self, InvalidRange> {
        config.validate()?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            config,
        })
    }
}

impl SensorSource for SimulatedSensor {
    fn read(&mut self) -> Result<SensorReading, SensorFault> {
        let temperature = round_tenth(self.rng.random_range(self.config.temperature()));
        let humidity = round_tenth(self.rng.random_range(self.config.humidity()));
        Ok(SensorReading::new(
            temperature,
            humidity,
            OffsetDateTime::now_utc(),
        ))
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_ranges() {
        let config = SimulatedSensorConfig::default();
        assert_eq!(config.temperature_min, 28.0);
        assert_eq!(config.temperature_max, 44.0);
        assert_eq!(config.humidity_min, 55.0);
        assert_eq!(config.humidity_max, 75.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_readings_stay_in_range_and_rounded() {
        let mut sensor = SimulatedSensor::seeded(42, SimulatedSensorConfig::default()).unwrap();

        for _ in 0..1_000 {
            let reading = sensor.read().unwrap();
            assert!((28.0..=44.0).contains(&reading.temperature));
            assert!((55.0..=75.0).contains(&reading.humidity));

            let tenths = reading.temperature * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let config = SimulatedSensorConfig::default();
        let mut a = SimulatedSensor::seeded(1234, config.clone()).unwrap();
        let mut b = SimulatedSensor::seeded(1234, config).unwrap();

        for _ in 0..50 {
            let ra = a.read().unwrap();
            let rb = b.read().unwrap();
            assert_eq!(ra.temperature, rb.temperature);
            assert_eq!(ra.humidity, rb.humidity);
        }
    }

    #[test]
    fn test_sequence_crosses_default_threshold() {
        let mut sensor = SimulatedSensor::seeded(99, SimulatedSensorConfig::default()).unwrap();
        let temps: Vec<f64> = (0..200).map(|_| sensor.read().unwrap().temperature).collect();

        assert!(temps.iter().any(|t| *t >= 40.0));
        assert!(temps.iter().any(|t| *t < 40.0));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let inverted = SimulatedSensorConfig {
            temperature_min: 50.0,
            temperature_max: 30.0,
            ..Default::default()
        };
        let err = SimulatedSensor::seeded(1, inverted).unwrap_err();
        assert_eq!(err.field, "temperature");

        let empty = SimulatedSensorConfig {
            humidity_min: 60.0,
            humidity_max: 60.0,
            ..Default::default()
        };
        assert_eq!(empty.validate().unwrap_err().field, "humidity");

        let nan = SimulatedSensorConfig {
            temperature_max: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_boxed_source() {
        let mut boxed: Box<dyn SensorSource> =
            Box::new(SimulatedSensor::seeded(3, SimulatedSensorConfig::default()).unwrap());
        assert!(boxed.read().is_ok());
    }
}
