//! Background controller.

use std::sync::Arc;

use tracing::info;

use fogger_core::{
    ControlHandle, ControlLoop, InvalidRange, RunningScheduler, Scheduler, SimulatedSensor,
};

use crate::config::Config;
use crate::event_log::SqliteEventLog;

/// Start the control loop on the simulated sensor.
///
/// Returns a handle for the API and the running task for shutdown. Must be
/// called from within a Tokio runtime.
pub fn spawn(
    config: &Config,
    events: Arc<SqliteEventLog>,
) -> Result<(ControlHandle, RunningScheduler), InvalidRange> {
    let ranges = config.sensor.ranges();
    let sensor = match config.sensor.seed {
        Some(seed) => {
            info!("Using simulated sensor with seed {}", seed);
            SimulatedSensor::seeded(seed, ranges)?
        }
        None => SimulatedSensor::new(ranges)?,
    };

    let options = config.control.options();
    info!(
        "Starting controller (threshold {:.1}, tick {}s, offset {})",
        options.threshold, config.control.tick_interval_secs, options.utc_offset
    );

    let control = ControlLoop::new(events, options);
    Ok(Scheduler::new(control, sensor)
        .period(config.control.tick_interval())
        .spawn())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogger_core::{MotorMode, ToggleRequest};
    use fogger_store::Store;

    #[tokio::test]
    async fn test_spawn_and_toggle() {
        let events = Arc::new(SqliteEventLog::new(Store::open_in_memory().unwrap()));
        let mut config = Config::default();
        config.sensor.seed = Some(1);

        let (handle, running) = spawn(&config, Arc::clone(&events)).unwrap();
        handle.toggle(ToggleRequest::On).await.unwrap();
        assert_eq!(handle.snapshot().mode, MotorMode::ManualOn);

        running.shutdown().await;
        let store = events.store().lock().await;
        assert_eq!(store.count_events().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_spawn_rejects_bad_ranges() {
        let events = Arc::new(SqliteEventLog::new(Store::open_in_memory().unwrap()));
        let mut config = Config::default();
        config.sensor.temperature_min = 50.0;
        config.sensor.temperature_max = 10.0;

        assert!(spawn(&config, events).is_err());
    }
}
