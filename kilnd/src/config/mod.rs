//! Configuration management module
//!
//! [`RuntimeConfig`] pairs the static daemon configuration with the
//! profile store persisted in the data directory.

mod runtime_config;

pub(crate) use runtime_config::RuntimeConfig;
