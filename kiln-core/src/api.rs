//! API models for the kiln REST API
//!
//! Request and response bodies shared by the daemon and the CLI.

use serde::{Deserialize, Serialize};

use crate::profile::{Profile, ProfileSummary};
use crate::run::RunState;

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ApiResponse<T> {
    #[serde(rename = "success")]
    Success { data: T },
    #[serde(rename = "error")]
    Error {
        error: String,
        /// Stable machine-readable reason, e.g. `DUPLICATE_TIME`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Create an error response
    pub fn error(error: String) -> Self {
        Self::Error { error, code: None }
    }

    /// Create an error response carrying a reason code
    pub fn error_with_code(error: String, code: impl Into<String>) -> Self {
        Self::Error {
            error,
            code: Some(code.into()),
        }
    }
}

/// Status snapshot returned by `GET /api/v0/status`
pub type StatusResponse = RunState;

/// Server information response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Server version
    pub version: String,
    /// Server uptime in seconds
    pub uptime: u64,
    /// Software information
    pub software: String,
    /// Control loop period in milliseconds
    pub tick_interval_ms: u64,
    /// Waypoint temperature limits enforced on save
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    /// Plant driving the control loop, e.g. "simulated"
    pub plant: String,
    /// Number of stored profiles
    pub profile_count: usize,
}

/// Profile listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<ProfileSummary>,
}

/// Single profile response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleProfileResponse {
    pub profile: Profile,
}

/// Run request; an absent or empty `profile_id` reuses the last selected profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
}

/// Response to a successful run request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    /// Name of the profile that started
    pub profile: String,
    /// Unix milliseconds
    pub started_at: Option<u64>,
}

/// Preview of the target temperature at a given elapsed time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetResponse {
    pub profile: String,
    pub elapsed_sec: f64,
    /// Absent once a `return_idle` profile has finished
    pub temp_c: Option<f64>,
    pub finished: bool,
}
