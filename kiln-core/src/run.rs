//! Run controller state machine
//!
//! ```text
//!            run(profile)                 tick: finished && return_idle
//!   idle ───────────────────▶ running ───────────────────────────────▶ idle
//!    ▲  ◀──────────────────────  │
//!    │          stop()            │ fault(reason)      (from any state)
//!    │                            ▼
//!    └──────── acknowledge() ── fault
//! ```
//!
//! The controller is a plain value: the daemon owns it, feeds it time, sensor
//! samples and duty, and publishes [`RunState`] snapshots. A run captures its
//! own copy of the profile, so edits to the store never reach a run in
//! progress.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::error::{KilnError, Result};
use crate::interpolate::{target_at, Target};
use crate::profile::{EndBehavior, Profile};

/// Controller status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Fault,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Fault => "fault",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where `run()` resolves profile names.
pub trait ProfileSource {
    fn lookup(&self, name: &str) -> Option<Profile>;
}

/// Consistent status snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    /// Set iff `status == running`
    pub active_profile: Option<String>,
    /// Unix milliseconds at which the current run started
    pub started_at: Option<u64>,
    pub elapsed_sec: Option<f64>,
    /// Measured temperature
    pub t_meas: Option<f64>,
    /// Target temperature
    pub t_set: Option<f64>,
    /// `t_set - t_meas`
    pub delta: Option<f64>,
    /// Actuator duty in [0, 1]
    pub duty: f64,
    pub finished: bool,
    pub run_switch: bool,
    pub fault: Option<String>,
    /// Number of ticks processed
    pub tick: u64,
}

#[derive(Debug, Clone)]
struct ActiveRun {
    profile: Profile,
    started: Instant,
    started_at_ms: u64,
}

#[derive(Debug, Default)]
pub struct RunController {
    status: RunStatus,
    active: Option<ActiveRun>,
    last_selected: Option<String>,
    elapsed_sec: Option<f64>,
    t_meas: Option<f64>,
    t_set: Option<f64>,
    duty: f64,
    finished: bool,
    run_switch: bool,
    fault: Option<String>,
    tick: u64,
}

impl RunController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Profile captured by the current run.
    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.as_ref().map(|a| &a.profile)
    }

    /// Name `run(None)` will resolve.
    pub fn last_selected(&self) -> Option<&str> {
        self.last_selected.as_deref()
    }

    pub fn t_set(&self) -> Option<f64> {
        self.t_set
    }

    /// Start a run.
    ///
    /// `requested` names the profile; `None` (or blank) reuses the last
    /// selected one. The profile is copied out of `source` and the state only
    /// changes on success. Calling this while running restarts the clock on
    /// a fresh copy, which may be a different profile. Only a latched fault
    /// refuses.
    pub fn run<S>(&mut self, requested: Option<&str>, source: &S, now: Instant) -> Result<&Profile>
    where
        S: ProfileSource + ?Sized,
    {
        if self.status == RunStatus::Fault {
            return Err(KilnError::Faulted(self.fault.clone().unwrap_or_default()));
        }

        let name = match requested.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => self
                .last_selected
                .clone()
                .ok_or_else(|| KilnError::ProfileNotFound("no profile selected".to_string()))?,
        };

        let profile = source
            .lookup(&name)
            .ok_or_else(|| KilnError::ProfileNotFound(name.clone()))?;
        let initial = target_at(&profile, 0.0)?;

        self.status = RunStatus::Running;
        self.last_selected = Some(name);
        self.elapsed_sec = Some(0.0);
        self.t_set = initial.temp_c;
        self.finished = false;
        let active = self.active.insert(ActiveRun {
            profile,
            started: now,
            started_at_ms: unix_millis(),
        });
        Ok(&active.profile)
    }

    /// End the current run. Idempotent; a latched fault stays latched.
    ///
    /// Returns the name of the profile that was running, if any.
    pub fn stop(&mut self) -> Option<String> {
        let stopped = self.active.as_ref().map(|a| a.profile.name.clone());
        if self.status == RunStatus::Running {
            self.status = RunStatus::Idle;
        }
        self.clear_run();
        self.finished = false;
        stopped
    }

    /// Advance the run to `now`.
    ///
    /// Returns the interpolator output while running and `None` otherwise.
    /// A finished `return_idle` profile moves the controller to idle.
    pub fn tick(&mut self, now: Instant) -> Result<Option<Target>> {
        self.tick += 1;

        let Some(active) = self.active.as_ref() else {
            return Ok(None);
        };
        let elapsed = now.saturating_duration_since(active.started).as_secs_f64();
        let end_behavior = active.profile.end_behavior;

        let target = match target_at(&active.profile, elapsed) {
            Ok(target) => target,
            Err(e) => {
                self.fault(e.to_string());
                return Err(e);
            }
        };

        self.elapsed_sec = Some(elapsed);
        self.t_set = target.temp_c;
        self.finished = target.finished;

        if target.finished && end_behavior == EndBehavior::ReturnIdle {
            self.status = RunStatus::Idle;
            self.clear_run();
        }

        Ok(Some(target))
    }

    /// Latch a fault from any state and drop the active run.
    ///
    /// A fault that is already latched keeps its original reason.
    pub fn fault(&mut self, reason: impl Into<String>) {
        if self.status != RunStatus::Fault {
            self.fault = Some(reason.into());
        }
        self.status = RunStatus::Fault;
        self.finished = false;
        self.clear_run();
    }

    /// Clear a latched fault and return to idle.
    pub fn acknowledge(&mut self) -> Result<String> {
        if self.status != RunStatus::Fault {
            return Err(KilnError::NotFaulted);
        }
        self.status = RunStatus::Idle;
        Ok(self.fault.take().unwrap_or_default())
    }

    /// Record a sensor sample. `run_switch` is informational only.
    pub fn record_sample(&mut self, t_meas: Option<f64>, run_switch: bool) {
        self.record_temperature(t_meas);
        self.run_switch = run_switch;
    }

    /// Record a temperature reading alone; the last run switch state stands.
    pub fn record_temperature(&mut self, t_meas: Option<f64>) {
        self.t_meas = t_meas.filter(|t| t.is_finite());
    }

    /// Record the duty the actuator applied, clamped to [0, 1].
    pub fn record_duty(&mut self, duty: f64) {
        self.duty = if duty.is_finite() {
            duty.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Drop `name` as the last selected profile, e.g. after it was deleted.
    pub fn forget(&mut self, name: &str) {
        if self.last_selected.as_deref() == Some(name) {
            self.last_selected = None;
        }
    }

    pub fn snapshot(&self) -> RunState {
        let delta = match (self.t_set, self.t_meas) {
            (Some(set), Some(meas)) => Some(set - meas),
            _ => None,
        };
        RunState {
            status: self.status,
            active_profile: self.active.as_ref().map(|a| a.profile.name.clone()),
            started_at: self.active.as_ref().map(|a| a.started_at_ms),
            elapsed_sec: self.active.as_ref().and(self.elapsed_sec),
            t_meas: self.t_meas,
            t_set: self.t_set,
            delta,
            duty: self.duty,
            finished: self.finished,
            run_switch: self.run_switch,
            fault: self.fault.clone(),
            tick: self.tick,
        }
    }

    fn clear_run(&mut self) {
        self.active = None;
        self.elapsed_sec = None;
        self.t_set = None;
        self.duty = 0.0;
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
