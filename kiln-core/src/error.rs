//! Error types for the kiln system

use thiserror::Error;

/// Reasons a profile candidate is rejected by the validator.
///
/// Variants are checked in declaration order; the first failing rule wins.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name is empty after trimming
    #[error("Profile name must not be empty")]
    EmptyName,

    /// Fewer than two usable points after dropping incomplete entries
    #[error("Profile needs at least 2 valid points, found {found}")]
    InsufficientPoints { found: usize },

    /// Two points share the same time
    #[error("Duplicate point time: {t_sec}s")]
    DuplicateTime { t_sec: f64 },

    /// Unknown end behavior
    #[error("Invalid end behavior '{0}' (expected hold_last or return_idle)")]
    InvalidEndBehavior(String),

    /// A point is scheduled before the run starts
    #[error("Point time must not be negative: {t_sec}s")]
    NegativeTime { t_sec: f64 },

    /// A point is outside the configured temperature limits
    #[error("Temperature {temp_c}°C at {t_sec}s is outside {min_c}..{max_c}°C")]
    TemperatureOutOfRange {
        t_sec: f64,
        temp_c: f64,
        min_c: f64,
        max_c: f64,
    },
}

impl ValidationError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyName => "EMPTY_NAME",
            ValidationError::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            ValidationError::DuplicateTime { .. } => "DUPLICATE_TIME",
            ValidationError::InvalidEndBehavior(_) => "INVALID_END_BEHAVIOR",
            ValidationError::NegativeTime { .. } => "NEGATIVE_TIME",
            ValidationError::TemperatureOutOfRange { .. } => "TEMPERATURE_OUT_OF_RANGE",
        }
    }
}

/// Core error type for kiln operations
#[derive(Error, Debug)]
pub enum KilnError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile rejected by the validator
    #[error("Invalid profile: {0}")]
    Validation(#[from] ValidationError),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// Profile cannot be interpreted (fewer than 2 points, bad elapsed time)
    #[error("Profile cannot be interpolated: {0}")]
    InvalidProfile(String),

    /// Controller is faulted and must be acknowledged first
    #[error("Controller is faulted: {0}")]
    Faulted(String),

    /// Acknowledge requested while no fault is latched
    #[error("Controller is not faulted")]
    NotFaulted,

    /// Sensor or actuator failure reported by the plant
    #[error("Actuator fault: {0}")]
    ActuatorFault(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl KilnError {
    /// Stable machine-readable code, surfaced in API error responses.
    pub fn code(&self) -> &'static str {
        match self {
            KilnError::Config(_) => "CONFIG",
            KilnError::Validation(e) => e.code(),
            KilnError::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            KilnError::InvalidProfile(_) => "INVALID_PROFILE",
            KilnError::Faulted(_) => "FAULTED",
            KilnError::NotFaulted => "NOT_FAULTED",
            KilnError::ActuatorFault(_) => "ACTUATOR_FAULT",
            KilnError::Io(_) => "IO",
            KilnError::Serialization(_) => "SERIALIZATION",
            KilnError::Other(_) => "INTERNAL",
        }
    }
}

/// Result type alias for kiln operations
pub type Result<T> = std::result::Result<T, KilnError>;

impl From<serde_json::Error> for KilnError {
    fn from(err: serde_json::Error) -> Self {
        KilnError::Serialization(err.to_string())
    }
}
