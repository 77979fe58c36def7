//! Control core for a temperature-driven fogging motor.
//!
//! This crate decides when the motor runs and records every start and stop.
//! It is transport agnostic: readings come from a [`SensorSource`], events go
//! to an [`EventLog`], and presentation layers observe a
//! [`ControlSnapshot`](fogger_types::ControlSnapshot).
//!
//! # Features
//!
//! - **Hysteresis control**: one ON and one OFF event per threshold crossing
//! - **Manual override**: operator start/stop that suppresses automatic control
//! - **Run-time accounting**: `"{m}m {s}s"` labels on every stop event
//! - **Serialized scheduling**: ticks and toggles processed by a single task
//! - **Simulation**: seeded random sensor for demos and soak tests
//!
//! # Modes
//!
//! | Mode | Motor | Entered by | Left by |
//! |------|-------|------------|---------|
//! | Off | stopped | startup, cool reading, manual stop | hot reading, manual start |
//! | Auto On | running | hot reading while unlatched | cool reading, manual start/stop |
//! | Manual On | running | manual start | manual stop |
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use fogger_core::{
//!     ControlLoop, ControlOptions, MemoryEventLog, Scheduler, SimulatedSensor,
//!     SimulatedSensorConfig, ToggleRequest,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let control = ControlLoop::new(MemoryEventLog::new(), ControlOptions::default());
//! let sensor = SimulatedSensor::seeded(7, SimulatedSensorConfig::default())?;
//!
//! let (handle, running) = Scheduler::new(control, sensor)
//!     .period(Duration::from_secs(5))
//!     .spawn();
//!
//! let transition = handle.toggle(ToggleRequest::On).await?;
//! println!("{} -> {}", transition.from, transition.to);
//!
//! running.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod error;
pub mod event_log;
pub mod mock;
pub mod options;
pub mod scheduler;
pub mod sensor;

pub use control::{ControlLoop, REASON_MANUAL_START, REASON_MANUAL_STOP, ToggleRequest, Transition};
pub use error::{ControlError, SchedulerError, SensorFault, StorageError};
pub use event_log::{EventLog, MAX_LIST_LIMIT, clamp_limit};
pub use mock::{MemoryEventLog, ScriptedSensor};
pub use options::{
    ControlOptions, DEFAULT_HOT_THRESHOLD, DEFAULT_TICK_INTERVAL, STARTUP_HUMIDITY,
    STARTUP_TEMPERATURE,
};
pub use scheduler::{ControlHandle, RunningScheduler, Scheduler};
pub use sensor::{InvalidRange, SensorSource, SimulatedSensor, SimulatedSensorConfig};

// Re-export from fogger-types
pub use fogger_types::{
    ControlSnapshot, HistoryEvent, MotorMode, MotorStatus, SensorReading, StoredEvent,
};
