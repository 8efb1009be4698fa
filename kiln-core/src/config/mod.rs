//! Configuration types for the kiln controller
//!
//! Configuration is split into:
//! - [`StaticConfig`] - server, control loop and simulation settings, loaded once at startup
//! - [`ProfileData`] - ramp profiles, mutable via API
//!
//! Mutable data lives in its own TOML file within the data directory.

mod paths;
mod profiles;
mod static_config;

pub use paths::{default_config_path, default_data_dir};
pub use profiles::ProfileData;
pub use static_config::{ControlConfig, ServerConfig, SimulationConfig, StaticConfig};
