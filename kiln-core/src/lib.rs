//! Kiln Core Library
//!
//! Ramp profiles, validation, setpoint interpolation and the run state
//! machine shared by the kiln daemon and CLI.

pub mod api;
pub mod config;
pub mod error;
pub mod interpolate;
pub mod profile;
pub mod run;
pub mod validate;

// Re-export commonly used types
pub use config::{
    default_config_path, default_data_dir, ControlConfig, ProfileData, ServerConfig,
    SimulationConfig, StaticConfig,
};
pub use error::*;
pub use interpolate::{target_at, Target};
pub use profile::*;
pub use run::{ProfileSource, RunController, RunState, RunStatus};
pub use validate::{validate, ProfileValidator, TempLimits};
