//! Control loop engine
//!
//! Owns the [`RunController`] and the plant behind one async mutex. The tick
//! task and operator commands both take that lock, so a command lands
//! atomically between two ticks. Every committed change is published on a
//! watch channel; readers clone the latest snapshot without waiting on the
//! lock.

use kiln_core::config::{ControlConfig, ProfileData};
use kiln_core::{Profile, Result, RunController, RunState, RunStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::plant::ThermalPlant;

struct EngineInner {
    controller: RunController,
    plant: Box<dyn ThermalPlant>,
    last_status_log: Option<Instant>,
}

pub(crate) struct Engine {
    inner: Mutex<EngineInner>,
    snapshots: watch::Sender<RunState>,
    tick_interval: Duration,
    max_temp_c: f64,
    status_log_interval: Duration,
    plant_kind: &'static str,
}

impl Engine {
    pub fn new(plant: Box<dyn ThermalPlant>, control: &ControlConfig) -> Self {
        let controller = RunController::new();
        let (snapshots, _) = watch::channel(controller.snapshot());
        Self {
            plant_kind: plant.kind(),
            inner: Mutex::new(EngineInner {
                controller,
                plant,
                last_status_log: None,
            }),
            snapshots,
            tick_interval: control.tick_interval(),
            max_temp_c: control.max_temp_c,
            status_log_interval: Duration::from_secs(control.status_log_interval_secs),
        }
    }

    pub fn plant_kind(&self) -> &'static str {
        self.plant_kind
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Last committed snapshot. Never blocks on the control loop.
    pub fn snapshot(&self) -> RunState {
        self.snapshots.borrow().clone()
    }

    /// Spawn the periodic tick task.
    ///
    /// Ticks never overlap; a tick that is due while the previous one is
    /// still running is skipped.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Starting control loop with {}ms tick interval",
                self.tick_interval.as_millis()
            );

            let mut interval = tokio::time::interval(self.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                self.tick_at(Instant::now()).await;
            }
        })
    }

    /// Run one control cycle: sample, check limits, advance, drive, publish.
    pub async fn tick_at(&self, now: Instant) -> RunState {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let before = inner.controller.status();

        match inner.plant.sample().await {
            Ok(sample) => {
                inner.controller.record_sample(sample.temp_c, sample.run_switch);
                match sample.temp_c.filter(|t| t.is_finite()) {
                    None => Self::enter_fault(&mut inner.controller, "sensor fault: no valid reading"),
                    Some(t) if t >= self.max_temp_c => Self::enter_fault(
                        &mut inner.controller,
                        format!("over temperature: {:.1}°C >= {:.1}°C", t, self.max_temp_c),
                    ),
                    Some(_) => {}
                }
            }
            Err(e) => {
                inner.controller.record_temperature(None);
                Self::enter_fault(&mut inner.controller, format!("sensor fault: {}", e));
            }
        }

        if let Err(e) = inner.controller.tick(now) {
            error!("Control tick failed: {}", e);
        }

        let setpoint = match inner.controller.status() {
            RunStatus::Running => inner.controller.t_set(),
            _ => None,
        };
        match inner.plant.drive(setpoint).await {
            Ok(duty) => inner.controller.record_duty(duty),
            Err(e) => {
                Self::enter_fault(&mut inner.controller, format!("actuator fault: {}", e));
                if let Err(e) = inner.plant.drive(None).await {
                    error!("Failed to de-energize after actuator fault: {}", e);
                }
                inner.controller.record_duty(0.0);
            }
        }

        let snapshot = inner.controller.snapshot();
        if snapshot.status != before {
            info!(
                "State {} -> {}{}",
                before,
                snapshot.status,
                snapshot
                    .fault
                    .as_ref()
                    .map(|f| format!(" ({})", f))
                    .unwrap_or_default()
            );
        }
        self.log_status(inner, &snapshot, now);

        self.publish(snapshot)
    }

    /// Start a run, by name or with the last selected profile.
    pub async fn run(&self, requested: Option<&str>, profiles: &ProfileData) -> Result<Profile> {
        let mut inner = self.inner.lock().await;
        let replaced = inner.controller.active_profile().map(|p| p.name.clone());
        let profile = inner
            .controller
            .run(requested, profiles, Instant::now())?
            .clone();
        if let Some(previous) = replaced {
            info!("Restarting: '{}' replaces active run of '{}'", profile.name, previous);
        }
        info!(
            "Run started: '{}' ({} points, {}s, end: {})",
            profile.name,
            profile.points.len(),
            profile.duration_sec(),
            profile.end_behavior
        );
        self.publish(inner.controller.snapshot());
        Ok(profile)
    }

    /// Stop the current run and de-energize. Always succeeds.
    pub async fn stop(&self) -> RunState {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        match inner.controller.stop() {
            Some(name) => info!("Run stopped: '{}'", name),
            None => debug!("Stop requested with no active run"),
        }
        if let Err(e) = inner.plant.drive(None).await {
            warn!("Failed to de-energize on stop: {}", e);
        }
        inner.controller.record_duty(0.0);
        self.publish(inner.controller.snapshot())
    }

    /// Clear a latched fault.
    pub async fn acknowledge(&self) -> Result<RunState> {
        let mut inner = self.inner.lock().await;
        let reason = inner.controller.acknowledge()?;
        info!("Fault acknowledged: {}", reason);
        Ok(self.publish(inner.controller.snapshot()))
    }

    /// Forget a deleted profile as the default for `run`.
    pub async fn forget(&self, name: &str) {
        self.inner.lock().await.controller.forget(name);
    }

    /// Stop any run and leave the actuator off.
    pub async fn shutdown(&self) {
        let snapshot = self.stop().await;
        info!("Control loop shut down (state: {})", snapshot.status);
    }

    fn enter_fault(controller: &mut RunController, reason: impl Into<String>) {
        let reason = reason.into();
        if controller.status() != RunStatus::Fault {
            warn!("Entering fault: {}", reason);
        }
        controller.fault(reason);
    }

    fn log_status(&self, inner: &mut EngineInner, snapshot: &RunState, now: Instant) {
        let due = inner
            .last_status_log
            .map_or(true, |last| now.saturating_duration_since(last) >= self.status_log_interval);
        if !due {
            return;
        }
        inner.last_status_log = Some(now);

        let fmt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v));
        if snapshot.status == RunStatus::Running {
            info!(
                "status={} profile={} elapsed={} t_meas={} t_set={} duty={:.2}",
                snapshot.status,
                snapshot.active_profile.as_deref().unwrap_or("-"),
                fmt(snapshot.elapsed_sec),
                fmt(snapshot.t_meas),
                fmt(snapshot.t_set),
                snapshot.duty
            );
        } else {
            debug!(
                "status={} t_meas={} duty={:.2}",
                snapshot.status,
                fmt(snapshot.t_meas),
                snapshot.duty
            );
        }
    }

    fn publish(&self, snapshot: RunState) -> RunState {
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}
