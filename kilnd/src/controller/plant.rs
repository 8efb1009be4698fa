//! Thermal plant abstraction
//!
//! The engine talks to the oven through [`ThermalPlant`]: it reads a sample
//! once per tick and hands back the setpoint, receiving the duty the
//! actuator applied. [`SimulatedPlant`] stands in for hardware.

use async_trait::async_trait;
use kiln_core::{KilnError, Result, SimulationConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// One sensor reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Sample {
    /// Measured temperature, `None` when the sensor has no valid reading
    pub temp_c: Option<f64>,
    /// Whether the actuator is permitted to energize
    pub run_switch: bool,
}

#[async_trait]
pub(crate) trait ThermalPlant: Send {
    /// Short identifier reported by the info endpoint.
    fn kind(&self) -> &'static str;

    /// Read the sensor.
    async fn sample(&mut self) -> Result<Sample>;

    /// Drive the actuator toward `setpoint`; `None` de-energizes.
    ///
    /// Returns the applied duty in [0, 1].
    async fn drive(&mut self, setpoint: Option<f64>) -> Result<f64>;
}

/// Proportional duty with bias, clamped to [0, 1].
pub(crate) fn proportional_duty(kp: f64, bias: f64, setpoint: f64, measured: f64) -> f64 {
    (kp * (setpoint - measured) + bias).clamp(0.0, 1.0)
}

/// First-order oven model: full duty heats at `heat_rate_c_per_sec`, and the
/// excess over ambient decays at `loss_per_sec`.
pub(crate) struct SimulatedPlant {
    config: SimulationConfig,
    temp_c: f64,
    duty: f64,
    last_update: Option<Instant>,
    rng: StdRng,
}

impl SimulatedPlant {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: SimulationConfig, rng: StdRng) -> Self {
        Self {
            temp_c: config.ambient_c,
            config,
            duty: 0.0,
            last_update: None,
            rng,
        }
    }

    /// True (noise-free) oven temperature.
    #[cfg(test)]
    pub fn temperature(&self) -> f64 {
        self.temp_c
    }

    /// Advance the model by `dt_sec` at the current duty.
    pub fn advance(&mut self, dt_sec: f64) {
        if dt_sec <= 0.0 {
            return;
        }
        let heating = self.duty * self.config.heat_rate_c_per_sec;
        let loss = self.config.loss_per_sec * (self.temp_c - self.config.ambient_c);
        self.temp_c += (heating - loss) * dt_sec;
    }
}

#[async_trait]
impl ThermalPlant for SimulatedPlant {
    fn kind(&self) -> &'static str {
        "simulated"
    }

    async fn sample(&mut self) -> Result<Sample> {
        let now = Instant::now();
        if let Some(last) = self.last_update {
            self.advance(now.duration_since(last).as_secs_f64());
        }
        self.last_update = Some(now);

        let noise = if self.config.noise_c > 0.0 {
            self.rng
                .gen_range(-self.config.noise_c..=self.config.noise_c)
        } else {
            0.0
        };

        Ok(Sample {
            temp_c: Some(self.temp_c + noise),
            run_switch: self.config.run_switch,
        })
    }

    async fn drive(&mut self, setpoint: Option<f64>) -> Result<f64> {
        if let Some(set) = setpoint {
            if !set.is_finite() {
                return Err(KilnError::ActuatorFault(format!(
                    "non-finite setpoint {}",
                    set
                )));
            }
        }

        self.duty = match setpoint {
            Some(set) if self.config.run_switch => {
                proportional_duty(self.config.kp, self.config.bias, set, self.temp_c)
            }
            _ => 0.0,
        };
        Ok(self.duty)
    }
}
