//! Periodic driver for the control loop.
//!
//! The [`Scheduler`] owns the [`ControlLoop`] and the [`SensorSource`] inside
//! a single task. Ticks and toggles are both delivered to that task, so they
//! are processed strictly one at a time and a toggle never interleaves with a
//! tick's save. Other tasks talk to it through a cloneable [`ControlHandle`].
//!
//! ```text
//!   ControlHandle ──mpsc──▶ ┌──────────────────────────┐
//!   ControlHandle ──mpsc──▶ │ scheduler task           │
//!          interval ──────▶ │  sensor.read()           │
//!                           │  control.on_tick/toggle  │──watch──▶ snapshots
//!                           └──────────────────────────┘
//! ```

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fogger_types::ControlSnapshot;

use crate::control::{ControlLoop, ToggleRequest, Transition};
use crate::error::{ControlError, SchedulerError};
use crate::event_log::EventLog;
use crate::options::DEFAULT_TICK_INTERVAL;
use crate::sensor::SensorSource;

/// Capacity of the command queue.
const COMMAND_CAPACITY: usize = 32;

type TickResult = Result<Option<Transition>, ControlError>;

#[derive(Debug)]
enum Command {
    Tick {
        reply: oneshot::Sender<TickResult>,
    },
    Toggle {
        request: ToggleRequest,
        reply: oneshot::Sender<Result<Transition, ControlError>>,
    },
}

/// Drives a [`ControlLoop`] from a [`SensorSource`] at a fixed period.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fogger_core::{ControlLoop, ControlOptions, MemoryEventLog, Scheduler, ScriptedSensor};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let control = ControlLoop::new(MemoryEventLog::new(), ControlOptions::default());
/// let sensor = ScriptedSensor::from_temperatures(&[41.0]);
///
/// let (handle, running) = Scheduler::new(control, sensor)
///     .period(Duration::from_secs(60))
///     .spawn();
///
/// handle.tick_now().await.unwrap();
/// assert!(handle.snapshot().motor_running());
/// running.shutdown().await;
/// # }
/// ```
#[derive(Debug)]
pub struct Scheduler<S, L> {
    control: ControlLoop<L>,
    sensor: S,
    period: Duration,
}

impl<S, L> Scheduler<S, L>
where
    S: SensorSource + 'static,
    L: EventLog + 'static,
{
    /// Create a scheduler ticking every [`DEFAULT_TICK_INTERVAL`].
    pub fn new(control: ControlLoop<L>, sensor: S) -> Self {
        Self {
            control,
            sensor,
            period: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Set the tick period.
    ///
    /// A zero period is raised to one millisecond.
    pub fn period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(1));
        self
    }

    /// Start the scheduler task.
    ///
    /// The first tick fires one period after this call. Must be called from
    /// within a Tokio runtime.
    pub fn spawn(self) -> (ControlHandle, RunningScheduler) {
        let (commands, rx) = mpsc::channel(COMMAND_CAPACITY);
        let (status_tx, status) = watch::channel(self.control.snapshot());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(self.run(rx, status_tx, cancel.clone()));

        (
            ControlHandle { commands, status },
            RunningScheduler { cancel, task },
        )
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Command>,
        status_tx: watch::Sender<ControlSnapshot>,
        cancel: CancellationToken,
    ) {
        info!("Scheduler started (period {:?})", self.period);

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(command) = rx.recv() => self.handle(command, &status_tx).await,
                _ = ticker.tick() => {
                    let _ = self.tick(&status_tx).await;
                }
            }
        }

        rx.close();
        let mut drained = 0;
        while let Ok(command) = rx.try_recv() {
            self.handle(command, &status_tx).await;
            drained += 1;
        }
        if drained > 0 {
            debug!("Processed {} queued command(s) on shutdown", drained);
        }

        info!("Scheduler stopped in mode {}", self.control.mode());
    }

    async fn handle(&mut self, command: Command, status_tx: &watch::Sender<ControlSnapshot>) {
        match command {
            Command::Tick { reply } => {
                let result = self.tick(status_tx).await;
                let _ = reply.send(result);
            }
            Command::Toggle { request, reply } => {
                let result = self.control.on_toggle(request).await;
                status_tx.send_replace(self.control.snapshot());
                let _ = reply.send(result);
            }
        }
    }

    async fn tick(&mut self, status_tx: &watch::Sender<ControlSnapshot>) -> TickResult {
        let reading = match self.sensor.read() {
            Ok(reading) => reading,
            Err(fault) => {
                warn!("Skipping tick: {}", fault);
                return Err(fault.into());
            }
        };

        let result = self.control.on_tick(reading).await;
        if let Err(ControlError::SensorFault(fault)) = &result {
            warn!("Skipping tick: {}", fault);
        }

        status_tx.send_replace(self.control.snapshot());
        result
    }
}

/// Cloneable handle to a running scheduler.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<ControlSnapshot>,
}

impl ControlHandle {
    /// Request a manual override and wait for its outcome.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Closed`] if the scheduler has stopped, otherwise
    /// whatever the control loop reported.
    pub async fn toggle(&self, request: ToggleRequest) -> Result<Transition, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Toggle { request, reply })
            .await
            .map_err(|_| SchedulerError::Closed)?;
        Ok(rx.await.map_err(|_| SchedulerError::Closed)??)
    }

    /// Run one tick immediately, outside the regular period.
    pub async fn tick_now(&self) -> Result<Option<Transition>, SchedulerError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Tick { reply })
            .await
            .map_err(|_| SchedulerError::Closed)?;
        Ok(rx.await.map_err(|_| SchedulerError::Closed)??)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> ControlSnapshot {
        self.status.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ControlSnapshot> {
        self.status.clone()
    }

    /// Whether the scheduler has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Ownership of the spawned scheduler task.
#[derive(Debug)]
pub struct RunningScheduler {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunningScheduler {
    /// Stop the scheduler and wait for the task to finish.
    ///
    /// The timer stops immediately. Commands already queued are still
    /// processed, so their saves complete or are reported; later requests
    /// fail with [`SchedulerError::Closed`].
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the task to finish without cancelling it.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Scheduler task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryEventLog, ScriptedSensor};
    use crate::options::ControlOptions;
    use fogger_types::MotorMode;
    use std::sync::Arc;

    fn scheduler(
        temperatures: &[f64],
    ) -> (Scheduler<ScriptedSensor, Arc<MemoryEventLog>>, Arc<MemoryEventLog>) {
        let log = Arc::new(MemoryEventLog::new());
        let control = ControlLoop::new(Arc::clone(&log), ControlOptions::default());
        let sensor = ScriptedSensor::from_temperatures(temperatures);
        (Scheduler::new(control, sensor), log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_ticks_drive_auto_cycle() {
        let (scheduler, log) = scheduler(&[41.0, 42.0, 38.0]);
        let (handle, running) = scheduler.period(Duration::from_secs(5)).spawn();

        assert_eq!(handle.snapshot().mode, MotorMode::Off);

        tokio::time::sleep(Duration::from_secs(16)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.mode, MotorMode::Off);
        assert_eq!(snapshot.temperature, Some(38.0));
        assert_eq!(log.count().await.unwrap(), 2);

        let events = log.list(10).await.unwrap();
        assert_eq!(events[0].event.duration_label, "0m 10s");

        running.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_first_period() {
        let (scheduler, log) = scheduler(&[45.0]);
        let (handle, running) = scheduler.period(Duration::from_secs(5)).spawn();

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(handle.snapshot().mode, MotorMode::Off);
        assert!(handle.snapshot().temperature.is_none());
        assert_eq!(log.count().await.unwrap(), 0);

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_toggle_through_handle() {
        let (scheduler, log) = scheduler(&[]);
        let (handle, running) = scheduler.period(Duration::from_secs(3600)).spawn();

        let on = handle.toggle(ToggleRequest::On).await.unwrap();
        assert_eq!(on.to, MotorMode::ManualOn);
        assert_eq!(handle.snapshot().mode, MotorMode::ManualOn);

        let err = handle.toggle(ToggleRequest::On).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Control(ControlError::InvalidToggle { .. })
        ));

        handle.toggle(ToggleRequest::Flip).await.unwrap();
        assert_eq!(handle.snapshot().mode, MotorMode::Off);
        assert_eq!(log.count().await.unwrap(), 2);

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_sensor_fault_skips_tick() {
        let log = Arc::new(MemoryEventLog::new());
        let control = ControlLoop::new(Arc::clone(&log), ControlOptions::default());
        let mut sensor = ScriptedSensor::new();
        sensor.push_fault("probe timeout").push_reading(41.0, 60.0);

        let (handle, running) = Scheduler::new(control, sensor)
            .period(Duration::from_secs(3600))
            .spawn();

        let err = handle.tick_now().await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Control(ControlError::SensorFault(_))
        ));
        assert_eq!(handle.snapshot().mode, MotorMode::Off);

        let transition = handle.tick_now().await.unwrap();
        assert!(transition.is_some());
        assert_eq!(handle.snapshot().mode, MotorMode::AutoOn);

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_storage_failure_still_publishes_state() {
        let (scheduler, log) = scheduler(&[41.0]);
        log.set_should_fail(true, Some("read-only database"));
        let (handle, running) = scheduler.period(Duration::from_secs(3600)).spawn();

        let err = handle.tick_now().await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Control(ControlError::StorageUnavailable { .. })
        ));

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.mode, MotorMode::AutoOn);
        assert_eq!(snapshot.unpersisted_events, 1);
        assert!(snapshot.last_event.is_some());

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_closed_after_shutdown() {
        let (scheduler, _) = scheduler(&[]);
        let (handle, running) = scheduler.spawn();

        running.shutdown().await;

        assert!(handle.is_closed());
        let err = handle.toggle(ToggleRequest::On).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Closed));
        assert!(matches!(
            handle.tick_now().await.unwrap_err(),
            SchedulerError::Closed
        ));
    }

    #[tokio::test]
    async fn test_subscribe_sees_updates() {
        let (scheduler, _) = scheduler(&[]);
        let (handle, running) = scheduler.period(Duration::from_secs(3600)).spawn();
        let mut status = handle.subscribe();

        handle.toggle(ToggleRequest::On).await.unwrap();
        status.changed().await.unwrap();
        assert_eq!(status.borrow().mode, MotorMode::ManualOn);

        running.shutdown().await;
    }
}
