//! The motor state machine.
//!
//! ```text
//!            t >= HOT && !latched             toggle on
//!   Off ─────────────────────────────▶ AutoOn ──────────▶ ManualOn
//!    ▲  ◀─────────────────────────────   │                  │
//!    │       t < HOT && latched          │ toggle off       │
//!    │                                   ▼                  │
//!    └───────────────────────────────────┴──────────────────┘
//!                         toggle off
//!   Off ──toggle on──▶ ManualOn
//! ```
//!
//! The latch absorbs repeated hot readings so an auto cycle produces exactly
//! one ON and one OFF event per threshold crossing. While `ManualOn`, ticks
//! only refresh the displayed reading.
//!
//! Every transition is decided first (pure state mutation) and persisted
//! second. When the save fails the new state is kept and the failure is
//! returned as [`ControlError::StorageUnavailable`].

use core::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use fogger_types::{
    ControlSnapshot, DURATION_PLACEHOLDER, HistoryEvent, MotorMode, SensorReading, format_duration,
};

use crate::error::{ControlError, SensorFault};
use crate::event_log::EventLog;
use crate::options::{ControlOptions, STARTUP_HUMIDITY, STARTUP_TEMPERATURE};

/// Reason recorded when an operator starts the motor.
pub const REASON_MANUAL_START: &str = "Manual Start";

/// Reason recorded when an operator stops the motor.
pub const REASON_MANUAL_STOP: &str = "Manual Stop";

/// A manual override request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleRequest {
    /// Start the motor in manual mode.
    On,
    /// Stop the motor.
    Off,
    /// Stop the motor if it is running, start it otherwise.
    Flip,
}

impl ToggleRequest {
    /// Resolve [`ToggleRequest::Flip`] against the current mode.
    pub fn resolve(self, mode: MotorMode) -> ToggleRequest {
        match self {
            ToggleRequest::Flip if mode.is_running() => ToggleRequest::Off,
            ToggleRequest::Flip => ToggleRequest::On,
            other => other,
        }
    }
}

impl fmt::Display for ToggleRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToggleRequest::On => write!(f, "on"),
            ToggleRequest::Off => write!(f, "off"),
            ToggleRequest::Flip => write!(f, "flip"),
        }
    }
}

/// A motor state change and the event it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Mode before the change.
    pub from: MotorMode,
    /// Mode after the change.
    pub to: MotorMode,
    /// The event recorded for the change.
    pub event: HistoryEvent,
    /// Id assigned by the event log, when the save succeeded.
    pub event_id: Option<i64>,
}

/// Mutable state owned by the control loop.
#[derive(Debug, Default)]
struct ControlState {
    mode: MotorMode,
    motor_start_time: Option<Instant>,
    last_alert_latched: bool,
}

/// The fogging motor state machine.
///
/// Owns its state exclusively and writes every transition to the injected
/// [`EventLog`].
///
/// # Example
///
/// ```
/// use fogger_core::{ControlLoop, ControlOptions, MemoryEventLog};
/// use fogger_types::{MotorMode, SensorReading};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut control = ControlLoop::new(MemoryEventLog::new(), ControlOptions::default());
///
/// let transition = control.on_tick(SensorReading::now(41.0, 60.0)).await.unwrap();
/// assert!(transition.is_some());
/// assert_eq!(control.mode(), MotorMode::AutoOn);
///
/// // Still hot: the latch absorbs the repeat.
/// assert!(control.on_tick(SensorReading::now(42.0, 60.0)).await.unwrap().is_none());
/// # }
/// ```
#[derive(Debug)]
pub struct ControlLoop<L> {
    state: ControlState,
    options: ControlOptions,
    log: L,
    last_reading: Option<SensorReading>,
    last_event: Option<HistoryEvent>,
    unpersisted_events: u64,
}

impl<L: EventLog> ControlLoop<L> {
    /// Create a controller in mode `Off` with the latch cleared.
    pub fn new(log: L, options: ControlOptions) -> Self {
        Self {
            state: ControlState::default(),
            options,
            log,
            last_reading: None,
            last_event: None,
            unpersisted_events: 0,
        }
    }

    /// Current motor mode.
    pub fn mode(&self) -> MotorMode {
        self.state.mode
    }

    /// Whether the high-temperature latch is set.
    pub fn is_latched(&self) -> bool {
        self.state.last_alert_latched
    }

    /// The options this controller runs with.
    pub fn options(&self) -> &ControlOptions {
        &self.options
    }

    /// The injected event log.
    pub fn event_log(&self) -> &L {
        &self.log
    }

    /// Most recent reading, if any tick has run.
    pub fn last_reading(&self) -> Option<&SensorReading> {
        self.last_reading.as_ref()
    }

    /// Number of transitions whose event could not be saved.
    pub fn unpersisted_events(&self) -> u64 {
        self.unpersisted_events
    }

    /// Read-only view for presentation.
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            mode: self.state.mode,
            temperature: self.last_reading.map(|r| r.temperature),
            humidity: self.last_reading.map(|r| r.humidity),
            last_event: self.last_event.clone(),
            unpersisted_events: self.unpersisted_events,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// Process one reading.
    ///
    /// Returns the transition it caused, if any. A non-finite reading is
    /// rejected as a [`SensorFault`] without touching any state.
    ///
    /// # Errors
    ///
    /// - [`ControlError::SensorFault`] for a non-finite reading
    /// - [`ControlError::StorageUnavailable`] if the transition could not be logged
    pub async fn on_tick(
        &mut self,
        reading: SensorReading,
    ) -> Result<Option<Transition>, ControlError> {
        let reading =
            SensorReading::try_new(reading.temperature, reading.humidity, reading.timestamp)
                .map_err(|e| SensorFault::new(e.to_string()))?;

        match self.decide_tick(reading) {
            Some(transition) => self.persist(transition).await.map(Some),
            None => Ok(None),
        }
    }

    /// Apply a manual override.
    ///
    /// # Errors
    ///
    /// - [`ControlError::InvalidToggle`] when switching on while `ManualOn`
    ///   or off while `Off`; nothing changes and nothing is logged
    /// - [`ControlError::StorageUnavailable`] if the transition could not be logged
    pub async fn on_toggle(&mut self, request: ToggleRequest) -> Result<Transition, ControlError> {
        let transition = self.decide_toggle(request)?;
        self.persist(transition).await
    }

    fn decide_tick(&mut self, reading: SensorReading) -> Option<Transition> {
        self.last_reading = Some(reading);
        let hot = self.options.is_hot(reading.temperature);

        match self.state.mode {
            MotorMode::ManualOn => None,
            MotorMode::Off if hot && !self.state.last_alert_latched => {
                self.state.last_alert_latched = true;
                self.state.motor_start_time = Some(Instant::now());
                let reason = format!("Auto ON - Temperature {:.1} Hot", reading.temperature);
                Some(self.enter(MotorMode::AutoOn, DURATION_PLACEHOLDER.to_string(), reason))
            }
            MotorMode::AutoOn if !hot && self.state.last_alert_latched => {
                self.state.last_alert_latched = false;
                let duration = self.take_duration();
                let reason = format!("Auto OFF - Temperature {:.1} Normal", reading.temperature);
                Some(self.enter(MotorMode::Off, duration, reason))
            }
            MotorMode::Off | MotorMode::AutoOn => None,
        }
    }

    fn decide_toggle(&mut self, request: ToggleRequest) -> Result<Transition, ControlError> {
        let mode = self.state.mode;
        match request.resolve(mode) {
            ToggleRequest::On if mode != MotorMode::ManualOn => {
                if mode == MotorMode::AutoOn {
                    // The running auto cycle is abandoned without an OFF event.
                    debug!("Manual start overrides running auto cycle");
                }
                self.state.last_alert_latched = false;
                self.state.motor_start_time = Some(Instant::now());
                Ok(self.enter(
                    MotorMode::ManualOn,
                    DURATION_PLACEHOLDER.to_string(),
                    REASON_MANUAL_START.to_string(),
                ))
            }
            ToggleRequest::Off if mode != MotorMode::Off => {
                self.state.last_alert_latched = false;
                let duration = self.take_duration();
                Ok(self.enter(MotorMode::Off, duration, REASON_MANUAL_STOP.to_string()))
            }
            _ => {
                warn!("Rejected toggle {} while motor is {}", request, mode);
                Err(ControlError::InvalidToggle {
                    mode,
                    requested: request,
                })
            }
        }
    }

    fn enter(&mut self, to: MotorMode, duration_label: String, reason: String) -> Transition {
        let from = self.state.mode;
        self.state.mode = to;

        let reading = self.last_reading.unwrap_or_else(|| {
            SensorReading::now(STARTUP_TEMPERATURE, STARTUP_HUMIDITY)
        });
        let created_at = OffsetDateTime::now_utc().to_offset(self.options.utc_offset);
        let event = HistoryEvent::new(to.status(), &reading, duration_label, reason, created_at);

        info!(
            "Motor {} -> {}: {} (duration {})",
            from, to, event.reason, event.duration_label
        );

        Transition {
            from,
            to,
            event,
            event_id: None,
        }
    }

    /// Elapsed run time since the motor started, clearing the start time.
    fn take_duration(&mut self) -> String {
        match self.state.motor_start_time.take() {
            Some(started) => format_duration(started.elapsed()),
            None => DURATION_PLACEHOLDER.to_string(),
        }
    }

    async fn persist(&mut self, mut transition: Transition) -> Result<Transition, ControlError> {
        self.last_event = Some(transition.event.clone());

        match self.log.save(&transition.event).await {
            Ok(stored) => {
                debug!("Logged {} event #{}", stored.event.status, stored.id);
                transition.event_id = Some(stored.id);
                Ok(transition)
            }
            Err(source) => {
                self.unpersisted_events += 1;
                error!(
                    "Motor is {} but the {} event was not logged ({} unlogged): {}",
                    transition.to,
                    transition.event.status,
                    self.unpersisted_events,
                    source
                );
                Err(ControlError::StorageUnavailable {
                    transition: Box::new(transition),
                    source,
                })
            }
        }
    }
}
