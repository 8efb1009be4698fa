//! Static configuration loaded once at startup
//!
//! This configuration is read-only after the daemon starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::paths::default_data_dir;
use crate::validate::TempLimits;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server hostname
    pub hostname: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 3000,
        }
    }
}

/// Control loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Tick period in milliseconds
    pub tick_interval_ms: u64,
    /// Lowest waypoint temperature accepted on save
    pub min_temp_c: f64,
    /// Highest waypoint temperature accepted on save; a measured temperature
    /// at or above it faults the controller
    pub max_temp_c: f64,
    /// Minimum seconds between status log lines
    pub status_log_interval_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            min_temp_c: -100.0,
            max_temp_c: 1300.0,
            status_log_interval_secs: 1,
        }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn limits(&self) -> TempLimits {
        TempLimits::new(self.min_temp_c, self.max_temp_c)
    }

    /// Check the section for inconsistent values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_ms == 0 {
            return Err("control.tick_interval_ms must be greater than 0".to_string());
        }
        if !self.min_temp_c.is_finite() || !self.max_temp_c.is_finite() {
            return Err("control temperature limits must be finite".to_string());
        }
        if self.min_temp_c >= self.max_temp_c {
            return Err(format!(
                "control.min_temp_c ({}) must be below control.max_temp_c ({})",
                self.min_temp_c, self.max_temp_c
            ));
        }
        Ok(())
    }
}

/// Simulated plant parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ambient and starting temperature
    pub ambient_c: f64,
    /// Proportional gain, duty per degree of error
    pub kp: f64,
    /// Duty added to the proportional term
    pub bias: f64,
    /// Heating rate at full duty, °C per second
    pub heat_rate_c_per_sec: f64,
    /// Fraction of the excess over ambient lost per second
    pub loss_per_sec: f64,
    /// Amplitude of uniform sensor noise
    pub noise_c: f64,
    /// Reported state of the run switch
    pub run_switch: bool,
}

impl SimulationConfig {
    /// Check the section for values the plant model cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("ambient_c", self.ambient_c),
            ("kp", self.kp),
            ("bias", self.bias),
            ("heat_rate_c_per_sec", self.heat_rate_c_per_sec),
            ("loss_per_sec", self.loss_per_sec),
            ("noise_c", self.noise_c),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("simulation.{} must be finite, got {}", name, value));
        }
        if self.noise_c < 0.0 {
            return Err(format!(
                "simulation.noise_c ({}) must not be negative",
                self.noise_c
            ));
        }
        if !(0.0..=1.0).contains(&self.loss_per_sec) {
            return Err(format!(
                "simulation.loss_per_sec ({}) must be between 0 and 1",
                self.loss_per_sec
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ambient_c: 20.0,
            kp: 0.03,
            bias: 0.0,
            heat_rate_c_per_sec: 5.0,
            loss_per_sec: 0.002,
            noise_c: 0.1,
            run_switch: true,
        }
    }
}

/// Static configuration for the kiln daemon.
///
/// Located at `~/.config/kiln/config.toml` by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Server configuration (hostname, port)
    pub server: ServerConfig,

    /// Control loop timing and temperature limits
    #[serde(default)]
    pub control: ControlConfig,

    /// Simulated plant
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Directory for mutable data files (profiles)
    ///
    /// Defaults to `~/.local/share/kiln` (XDG data directory).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            control: ControlConfig::default(),
            simulation: SimulationConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl StaticConfig {
    /// Create a new StaticConfig with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
