//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use fogger_core::{ControlOptions, DEFAULT_HOT_THRESHOLD, SimulatedSensorConfig};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Control loop settings.
    pub control: ControlConfig,
    /// Simulated sensor settings.
    pub sensor: SensorConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_or_default(default_config_path())
    }

    /// Load configuration from a file, or use defaults if it does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path is not empty
    /// - Threshold is finite, tick interval is 1s - 1 hour, offset within ±18h
    /// - Sensor ranges are finite and non-empty
    ///
    /// # Example
    ///
    /// ```
    /// use fogger_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.control.validate());
        errors.extend(self.sensor.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Ok(_) => {}
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: fogger_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.path",
                "database path cannot be empty",
            ));
        }

        errors
    }
}

/// Minimum tick interval in seconds.
pub const MIN_TICK_INTERVAL: u64 = 1;
/// Maximum tick interval in seconds (1 hour).
pub const MAX_TICK_INTERVAL: u64 = 3600;
/// Largest accepted UTC offset in minutes (18 hours).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Control loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Hot threshold in °C.
    pub threshold: f64,
    /// Seconds between sensor reads.
    pub tick_interval_secs: u64,
    /// Offset applied to event date/time labels, in minutes east of UTC.
    pub utc_offset_minutes: i32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HOT_THRESHOLD,
            tick_interval_secs: 5,
            utc_offset_minutes: 0,
        }
    }
}

impl ControlConfig {
    /// Validate control configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.threshold.is_finite() {
            errors.push(ValidationError::new(
                "control.threshold",
                format!("threshold {} must be a finite number", self.threshold),
            ));
        }

        if self.tick_interval_secs < MIN_TICK_INTERVAL {
            errors.push(ValidationError::new(
                "control.tick_interval_secs",
                format!(
                    "tick interval {} is too short (minimum {} second)",
                    self.tick_interval_secs, MIN_TICK_INTERVAL
                ),
            ));
        } else if self.tick_interval_secs > MAX_TICK_INTERVAL {
            errors.push(ValidationError::new(
                "control.tick_interval_secs",
                format!(
                    "tick interval {} is too long (maximum {} seconds / 1 hour)",
                    self.tick_interval_secs, MAX_TICK_INTERVAL
                ),
            ));
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            errors.push(ValidationError::new(
                "control.utc_offset_minutes",
                format!(
                    "offset {} is out of range (at most ±{} minutes)",
                    self.utc_offset_minutes, MAX_UTC_OFFSET_MINUTES
                ),
            ));
        }

        errors
    }

    /// Tick period.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Offset for event labels; UTC if out of range.
    pub fn utc_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or(UtcOffset::UTC)
    }

    /// Options for the control loop.
    pub fn options(&self) -> ControlOptions {
        ControlOptions::default()
            .threshold(self.threshold)
            .utc_offset(self.utc_offset())
    }
}

/// Simulated sensor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Fixed RNG seed for reproducible runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Lower bound for temperature.
    pub temperature_min: f64,
    /// Upper bound for temperature.
    pub temperature_max: f64,
    /// Lower bound for humidity.
    pub humidity_min: f64,
    /// Upper bound for humidity.
    pub humidity_max: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        let ranges = SimulatedSensorConfig::default();
        Self {
            seed: None,
            temperature_min: ranges.temperature_min,
            temperature_max: ranges.temperature_max,
            humidity_min: ranges.humidity_min,
            humidity_max: ranges.humidity_max,
        }
    }
}

impl SensorConfig {
    /// The sampling ranges.
    pub fn ranges(&self) -> SimulatedSensorConfig {
        SimulatedSensorConfig {
            temperature_min: self.temperature_min,
            temperature_max: self.temperature_max,
            humidity_min: self.humidity_min,
            humidity_max: self.humidity_max,
        }
    }

    /// Validate sensor configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        self.ranges()
            .invalid_ranges()
            .into_iter()
            .map(|e| ValidationError::new(format!("sensor.{}", e.field), e.to_string()))
            .collect()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `control.threshold`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fogger")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.control.threshold, 40.0);
        assert_eq!(config.control.tick_interval_secs, 5);
        assert!(config.sensor.seed.is_none());
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.path, fogger_store::default_db_path());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("server.toml");

        let config = Config {
            server: ServerConfig {
                bind: "0.0.0.0:9090".to_string(),
            },
            storage: StorageConfig {
                path: PathBuf::from("/tmp/fogger-test.db"),
            },
            control: ControlConfig {
                threshold: 38.5,
                tick_interval_secs: 10,
                utc_offset_minutes: 330,
            },
            sensor: SensorConfig {
                seed: Some(42),
                ..Default::default()
            },
        };

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.storage.path, PathBuf::from("/tmp/fogger-test.db"));
        assert_eq!(loaded.control.threshold, 38.5);
        assert_eq!(loaded.control.tick_interval_secs, 10);
        assert_eq!(loaded.control.utc_offset_minutes, 330);
        assert_eq!(loaded.sensor.seed, Some(42));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_config_load_or_default_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(temp_dir.path().join("server.toml")).unwrap();
        assert_eq!(config.control.threshold, 40.0);
    }

    #[test]
    fn test_config_load_or_default_rejects_malformed_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("server.toml");
        std::fs::write(&config_path, "[control]\nthreshold = \"35\"\n").unwrap();

        let result = Config::load_or_default(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_config_partial_toml_uses_defaults() {
        let toml = r#"
            [control]
            threshold = 42.0

            [sensor]
            seed = 7
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.control.threshold, 42.0);
        assert_eq!(config.control.tick_interval_secs, 5);
        assert_eq!(config.sensor.seed, Some(7));
        assert_eq!(config.sensor.temperature_max, 44.0);
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("fogger/server.toml"));
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_server_bind_validation() {
        let ok = |bind: &str| {
            ServerConfig {
                bind: bind.to_string(),
            }
            .validate()
        };

        assert!(ok("127.0.0.1:8080").is_empty());
        assert!(ok("[::1]:8080").is_empty());
        assert!(ok("localhost:8080").is_empty());

        assert!(ok("")[0].message.contains("cannot be empty"));
        assert!(ok("127.0.0.1")[0].message.contains("host:port"));
        assert!(ok("127.0.0.1:0")[0].message.contains("cannot be 0"));
        assert!(ok("127.0.0.1:abc")[0].message.contains("must be a number"));
    }

    #[test]
    fn test_storage_path_validation() {
        let empty = StorageConfig {
            path: PathBuf::new(),
        };
        let errors = empty.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));
    }

    #[test]
    fn test_control_validation() {
        let bad = ControlConfig {
            threshold: f64::NAN,
            tick_interval_secs: 0,
            utc_offset_minutes: 19 * 60,
        };
        let errors = bad.validate();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "control.threshold");
        assert!(errors[1].message.contains("too short"));
        assert!(errors[2].message.contains("out of range"));

        let slow = ControlConfig {
            tick_interval_secs: 7200,
            ..Default::default()
        };
        assert!(slow.validate()[0].message.contains("too long"));
    }

    #[test]
    fn test_control_options() {
        let config = ControlConfig {
            threshold: 35.0,
            tick_interval_secs: 2,
            utc_offset_minutes: -300,
        };
        let options = config.options();
        assert_eq!(options.threshold, 35.0);
        assert_eq!(options.utc_offset.whole_hours(), -5);
        assert_eq!(config.tick_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_sensor_validation() {
        let inverted = SensorConfig {
            humidity_min: 80.0,
            humidity_max: 20.0,
            ..Default::default()
        };
        let errors = inverted.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sensor.humidity");
    }

    #[test]
    fn test_sensor_validation_reports_every_range() {
        let sensor = SensorConfig {
            temperature_min: f64::NAN,
            humidity_min: 80.0,
            humidity_max: 20.0,
            ..Default::default()
        };
        let fields: Vec<String> = sensor.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["sensor.temperature", "sensor.humidity"]);
    }

    #[test]
    fn test_config_validation_error_display() {
        let config = Config {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
            control: ControlConfig {
                tick_interval_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let display = config.validate().unwrap_err().to_string();
        assert!(display.contains("server.bind"));
        assert!(display.contains("control.tick_interval_secs"));
    }
}
