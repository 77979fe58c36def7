//! Test doubles for the control loop seams.
//!
//! - [`ScriptedSensor`] replays a fixed sequence of readings and faults.
//! - [`MemoryEventLog`] keeps events in memory and can be told to fail,
//!   either permanently or for the next `n` writes.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use fogger_types::{HistoryEvent, SensorReading, StoredEvent};

use crate::error::{SensorFault, StorageError};
use crate::event_log::{EventLog, clamp_limit};
use crate::sensor::SensorSource;

/// Humidity used by [`ScriptedSensor::from_temperatures`].
pub const SCRIPTED_HUMIDITY: f64 = 60.0;

/// A sensor that replays a script.
///
/// Once the script is exhausted every read returns a fault.
///
/// # Example
///
/// ```
/// use fogger_core::{ScriptedSensor, SensorSource};
///
/// let mut sensor = ScriptedSensor::from_temperatures(&[41.0, 38.0]);
/// assert_eq!(sensor.read().unwrap().temperature, 41.0);
/// assert_eq!(sensor.read().unwrap().temperature, 38.0);
/// assert!(sensor.read().is_err());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Result<SensorReading, SensorFault>>,
    read_count: u32,
}

impl ScriptedSensor {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one reading per temperature, all at [`SCRIPTED_HUMIDITY`].
    pub fn from_temperatures(temperatures: &[f64]) -> Self {
        let mut sensor = Self::new();
        for &t in temperatures {
            sensor.push_reading(t, SCRIPTED_HUMIDITY);
        }
        sensor
    }

    /// Append a reading.
    pub fn push_reading(&mut self, temperature: f64, humidity: f64) -> &mut Self {
        self.script
            .push_back(Ok(SensorReading::now(temperature, humidity)));
        self
    }

    /// Append a fault.
    pub fn push_fault(&mut self, message: &str) -> &mut Self {
        self.script.push_back(Err(SensorFault::new(message)));
        self
    }

    /// Entries left in the script.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Number of reads performed.
    pub fn read_count(&self) -> u32 {
        self.read_count
    }
}

impl SensorSource for ScriptedSensor {
    fn read(&mut self) -> Result<SensorReading, SensorFault> {
        self.read_count += 1;
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(SensorFault::new("script exhausted")))
    }
}

/// An in-memory [`EventLog`].
///
/// Ids start at 1 and increase monotonically; clearing does not reset them.
pub struct MemoryEventLog {
    events: RwLock<Vec<StoredEvent>>,
    next_id: AtomicU64,
    save_count: AtomicU32,
    should_fail: AtomicBool,
    fail_message: Mutex<String>,
    /// Writes left to fail before succeeding again.
    remaining_failures: AtomicU32,
}

impl std::fmt::Debug for MemoryEventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventLog")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            save_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            fail_message: Mutex::new("Mock failure".to_string()),
            remaining_failures: AtomicU32::new(0),
        }
    }

    /// Make every operation fail until reset.
    pub fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message
            && let Ok(mut current) = self.fail_message.lock()
        {
            *current = msg.to_string();
        }
    }

    /// Fail the next `count` operations, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Number of save attempts, failed ones included.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }

    /// Copy of every stored event, oldest first.
    pub async fn events(&self) -> Vec<StoredEvent> {
        self.events.read().await.clone()
    }

    fn check_should_fail(&self) -> Result<(), StorageError> {
        let transient = self
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();

        if transient || self.should_fail.load(Ordering::Relaxed) {
            let message = self
                .fail_message
                .lock()
                .map(|m| m.clone())
                .unwrap_or_else(|_| "Mock failure".to_string());
            Err(StorageError::Unavailable(message))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn save(&self, event: &HistoryEvent) -> Result<StoredEvent, StorageError> {
        self.save_count.fetch_add(1, Ordering::Relaxed);
        self.check_should_fail()?;

        let mut events = self.events.write().await;
        let stored = StoredEvent {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) as i64,
            event: event.clone(),
        };
        events.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, limit: usize) -> Result<Vec<StoredEvent>, StorageError> {
        self.check_should_fail()?;
        let events = self.events.read().await;
        Ok(events.iter().rev().take(clamp_limit(limit)).cloned().collect())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.check_should_fail()?;
        Ok(self.events.read().await.len() as u64)
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        self.check_should_fail()?;
        let mut events = self.events.write().await;
        let removed = events.len() as u64;
        events.clear();
        Ok(removed)
    }
}
