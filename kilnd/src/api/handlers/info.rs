//! Info handlers for system information and root endpoint

use crate::api::error::ApiError;
use crate::api::AppState;

use axum::{extract::State, Json};
use kiln_core::api::{ApiResponse, InfoResponse};
use serde_json::{json, Value};
use tracing::debug;

/// Handle the root endpoint.
///
/// Provide basic service identification and status. Useful for health checks
/// and verifying the API is accessible.
///
/// # Endpoint
///
/// `GET /`
pub(crate) async fn root() -> Result<Json<ApiResponse<Value>>, ApiError> {
    debug!("Request: GET /");

    let data = json!({
        "service": "Kiln Controller API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok"
    });

    Ok(Json(ApiResponse::success(data)))
}

/// Retrieve system information.
///
/// # Endpoint
///
/// `GET /api/v0/info`
///
/// # Returns
///
/// - `version` - Server version
/// - `uptime` - Server uptime in seconds
/// - `tick_interval_ms` - Control loop period
/// - `min_temp_c` / `max_temp_c` - Waypoint limits enforced on save
/// - `plant` - Plant driving the loop
/// - `profile_count` - Number of stored profiles
pub(crate) async fn get_info(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<InfoResponse>>, ApiError> {
    debug!("Request: GET /api/v0/info");

    let control = &state.config.static_config().control;
    let profile_count = state.config.profiles().await.len();

    let info_response = InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        software: format!("Kiln Server v{}", env!("CARGO_PKG_VERSION")),
        tick_interval_ms: state.engine.tick_interval().as_millis() as u64,
        min_temp_c: control.min_temp_c,
        max_temp_c: control.max_temp_c,
        plant: state.engine.plant_kind().to_string(),
        profile_count,
    };

    Ok(Json(ApiResponse::success(info_response)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, TestApp};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root() {
        let app = TestApp::new().await;
        let response = app
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_get_info() {
        let app = TestApp::new().await;
        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/v0/info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        let data = &json["data"];
        assert_eq!(data["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(data["plant"], "simulated");
        assert_eq!(data["tick_interval_ms"], 1000);
        assert_eq!(data["max_temp_c"], 1300.0);
        assert_eq!(data["profile_count"], 2);
    }
}
