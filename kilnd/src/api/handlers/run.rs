//! Run control handlers

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::{api_fail, api_ok};
use axum::{body::Bytes, extract::State, Json};
use kiln_core::api::{ApiResponse, RunRequest, RunResponse, StatusResponse};
use tracing::{debug, info};

/// Start a run.
///
/// The body is optional. Without a `profile_id` the last selected profile is
/// used.
///
/// # Endpoint
///
/// `POST /api/v0/run`
///
/// # Errors
///
/// - 404 `PROFILE_NOT_FOUND` when the name is unknown or nothing was selected yet
/// - 409 `FAULTED` while a fault is latched
///
/// A run request while running restarts on the requested profile.
pub(crate) async fn start_run(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<RunResponse>>, ApiError> {
    debug!("Request: POST /api/v0/run");

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RunRequest::default()
    } else {
        match serde_json::from_slice::<RunRequest>(&body) {
            Ok(request) => request,
            Err(e) => return api_fail!(format!("Invalid run request: {}", e)),
        }
    };

    let profile = {
        let profiles = state.config.profiles().await;
        state
            .engine
            .run(request.profile_id.as_deref(), &profiles)
            .await?
    };

    info!("Run requested for profile '{}'", profile.name);
    api_ok!(RunResponse {
        profile: profile.name,
        started_at: state.engine.snapshot().started_at,
    })
}

/// Stop the current run. Always succeeds.
///
/// # Endpoint
///
/// `POST /api/v0/stop`
pub(crate) async fn stop_run(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    debug!("Request: POST /api/v0/stop");
    api_ok!(state.engine.stop().await)
}

/// Acknowledge a latched fault, returning to idle.
///
/// # Endpoint
///
/// `POST /api/v0/fault/ack`
pub(crate) async fn acknowledge_fault(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<StatusResponse>>, ApiError> {
    debug!("Request: POST /api/v0/fault/ack");
    api_ok!(state.engine.acknowledge().await?)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, TestApp};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use kiln_core::{RunStatus, SimulationConfig};
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    async fn post(app: &TestApp, uri: &str, body: Option<&str>) -> Response {
        let builder = Request::builder().method(Method::POST).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.router().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_run_without_selection_is_not_found() {
        let app = TestApp::new().await;

        let response = post(&app, "/api/v0/run", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["code"], "PROFILE_NOT_FOUND");
        assert_eq!(app.state.engine.snapshot().status, RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_run_unknown_profile() {
        let app = TestApp::new().await;
        let response = post(&app, "/api/v0/run", Some(r#"{"profile_id": "cone10"}"#)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.state.engine.snapshot().status, RunStatus::Idle);
    }

    #[tokio::test]
    async fn test_run_stop_and_rerun_last_selected() {
        let app = TestApp::new().await;

        let response = post(&app, "/api/v0/run", Some(r#"{"profile_id": "bisque"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["profile"], "bisque");
        assert!(json["data"]["started_at"].is_u64());

        let snap = app.state.engine.snapshot();
        assert_eq!(snap.status, RunStatus::Running);
        assert_eq!(snap.active_profile.as_deref(), Some("bisque"));

        // A second run replaces the active profile and becomes the default
        let response = post(&app, "/api/v0/run", Some(r#"{"profile_id": "anneal"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["profile"], "anneal");
        let snap = app.state.engine.snapshot();
        assert_eq!(snap.status, RunStatus::Running);
        assert_eq!(snap.active_profile.as_deref(), Some("anneal"));

        let response = post(&app, "/api/v0/stop", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["status"], "idle");

        // Empty body reuses the last selected profile
        let response = post(&app, "/api/v0/run", Some("{}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["profile"], "anneal");
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_ok() {
        let app = TestApp::new().await;
        let response = post(&app, "/api/v0/stop", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_run_body() {
        let app = TestApp::new().await;
        let response = post(&app, "/api/v0/run", Some("{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_deleting_running_profile_keeps_run() {
        let app = TestApp::new().await;
        post(&app, "/api/v0/run", Some(r#"{"profile_id": "bisque"}"#)).await;

        let response = app
            .router()
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/v0/profile/bisque")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let snap = app
            .state
            .engine
            .tick_at(Instant::now() + Duration::from_secs(360))
            .await;
        assert_eq!(snap.status, RunStatus::Running);
        assert_eq!(snap.active_profile.as_deref(), Some("bisque"));

        // The deleted profile is no longer the default
        post(&app, "/api/v0/stop", None).await;
        let response = post(&app, "/api/v0/run", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_acknowledge_flow() {
        let app = TestApp::new().await;
        let response = post(&app, "/api/v0/fault/ack", None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["code"], "NOT_FAULTED");

        // An oven sitting above the limit faults on the first tick
        let app = TestApp::with_simulation(SimulationConfig {
            ambient_c: 1500.0,
            noise_c: 0.0,
            ..Default::default()
        })
        .await;
        let snap = app.state.engine.tick_at(Instant::now()).await;
        assert_eq!(snap.status, RunStatus::Fault);

        let response = post(&app, "/api/v0/run", Some(r#"{"profile_id": "bisque"}"#)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["code"], "FAULTED");

        let response = post(&app, "/api/v0/fault/ack", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["status"], "idle");
        assert!(json["data"]["fault"].is_null());
    }
}
