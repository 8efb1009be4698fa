//! Status handler

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::api_ok;
use axum::{extract::State, Json};
use kiln_core::api::{ApiResponse, StatusResponse};
use tracing::debug;

/// Latest committed run state snapshot.
///
/// Reads the published snapshot and never waits on the control loop.
///
/// # Endpoint
///
/// `GET /api/v0/status`
pub(crate) async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    debug!("Request: GET /api/v0/status");
    api_ok!(state.engine.snapshot())
}
