//! Profile handlers for CRUD operations and target preview

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::{api_fail, api_ok};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use kiln_core::{
    api::{ApiResponse, ProfileListResponse, SingleProfileResponse, TargetResponse},
    target_at, ProfileCandidate,
};
use serde::Deserialize;

use tracing::{debug, info};

/// Query parameters for target preview
#[derive(Deserialize)]
pub struct TargetQuery {
    /// Seconds since run start
    pub elapsed: f64,
}

/// List all stored profiles as summaries, sorted by name.
///
/// # Endpoint
///
/// `GET /api/v0/profiles/list`
pub(crate) async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProfileListResponse>>, ApiError> {
    debug!("Request: GET /api/v0/profiles/list");

    let profiles = state.config.profiles().await.summaries();

    info!("Listed {} profiles", profiles.len());
    api_ok!(ProfileListResponse { profiles })
}

/// Get a single profile with all its points.
///
/// # Endpoint
///
/// `GET /api/v0/profile/{name}/get`
pub(crate) async fn get_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<SingleProfileResponse>>, ApiError> {
    debug!("Request: GET /api/v0/profile/{}/get", name);

    let profile = state.config.get_profile(&name).await?;
    api_ok!(SingleProfileResponse { profile })
}

/// Validate and upsert a profile keyed by its name.
///
/// Returns the canonical profile (trimmed name, points sorted by time).
/// Nothing is stored when validation fails.
///
/// Mistyped fields reach the validator and get its reason code; only a body
/// that is not a JSON object is rejected as `MALFORMED_BODY`.
///
/// # Endpoint
///
/// `POST /api/v0/profiles/save`
pub(crate) async fn save_profile(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ApiResponse<SingleProfileResponse>>, ApiError> {
    debug!("Request: POST /api/v0/profiles/save");

    let candidate = match serde_json::from_slice::<ProfileCandidate>(&body) {
        Ok(candidate) => candidate,
        Err(e) => return api_fail!(format!("Invalid profile body: {}", e), "MALFORMED_BODY"),
    };

    let (profile, replaced) = state.config.save_profile(&candidate).await?;

    info!(
        "{} profile '{}' ({} points, end: {})",
        if replaced { "Updated" } else { "Added" },
        profile.name,
        profile.points.len(),
        profile.end_behavior
    );
    api_ok!(SingleProfileResponse { profile })
}

/// Delete a profile.
///
/// A run already using the profile keeps its own copy; the profile stops
/// being the default for a run without an explicit name.
///
/// # Endpoint
///
/// `DELETE /api/v0/profile/{name}`
pub(crate) async fn delete_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    debug!("Request: DELETE /api/v0/profile/{}", name);

    state.config.delete_profile(&name).await?;
    state.engine.forget(&name).await;

    info!("Deleted profile: {}", name);
    api_ok!(())
}

/// Preview the target temperature of a stored profile at an elapsed time.
///
/// # Endpoint
///
/// `GET /api/v0/profile/{name}/target?elapsed=X`
pub(crate) async fn preview_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<TargetQuery>,
) -> Result<Json<ApiResponse<TargetResponse>>, ApiError> {
    debug!(
        "Request: GET /api/v0/profile/{}/target?elapsed={}",
        name, params.elapsed
    );

    if !params.elapsed.is_finite() {
        return api_fail!(format!(
            "Elapsed time must be a finite number of seconds, got {}",
            params.elapsed
        ));
    }

    let profile = state.config.get_profile(&name).await?;
    let target = target_at(&profile, params.elapsed)?;

    api_ok!(TargetResponse {
        profile: profile.name,
        elapsed_sec: params.elapsed,
        temp_c: target.temp_c,
        finished: target.finished,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{body_json, TestApp};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    async fn send(app: &TestApp, method: Method, uri: &str, body: Option<&str>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
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
    async fn test_list_profiles() {
        let app = TestApp::new().await;
        let response = send(&app, Method::GET, "/api/v0/profiles/list", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        let profiles = json["data"]["profiles"].as_array().unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0]["name"], "anneal");
        assert_eq!(profiles[1]["name"], "bisque");
        assert_eq!(profiles[1]["point_count"], 3);
        assert_eq!(profiles[1]["end_behavior"], "hold_last");
        // Summaries do not carry points
        assert!(profiles[1].get("points").is_none());
    }

    #[tokio::test]
    async fn test_save_then_get_roundtrip() {
        let app = TestApp::new().await;
        let response = send(
            &app,
            Method::POST,
            "/api/v0/profiles/save",
            Some(
                r#"{"name": " glaze ", "end_behavior": "return_idle", "points": [
                    {"t_sec": 600, "temp_c": 900},
                    {"t_sec": 0, "temp_c": 20},
                    {"t_sec": 1200, "temp_c": 900}
                ]}"#,
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response.into_body()).await;
        assert_eq!(saved["data"]["profile"]["name"], "glaze");

        let response = send(&app, Method::GET, "/api/v0/profile/glaze/get", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response.into_body()).await;
        let profile = &fetched["data"]["profile"];
        assert_eq!(profile, &saved["data"]["profile"]);
        assert_eq!(profile["end_behavior"], "return_idle");
        assert_eq!(profile["points"][0]["t_sec"], 0.0);
        assert_eq!(profile["points"][2]["t_sec"], 1200.0);
    }

    #[tokio::test]
    async fn test_save_validation_codes() {
        let app = TestApp::new().await;
        let cases = [
            (r#"{"name": "  ", "points": []}"#, "EMPTY_NAME"),
            (
                r#"{"name": "a", "points": [{"t_sec": 0, "temp_c": 20}, {"t_sec": 5}]}"#,
                "INSUFFICIENT_POINTS",
            ),
            (
                r#"{"name": "a", "points": [{"t_sec": 5, "temp_c": 20}, {"t_sec": 5, "temp_c": 30}]}"#,
                "DUPLICATE_TIME",
            ),
            (
                r#"{"name": "a", "end_behavior": "loop", "points": [{"t_sec": 0, "temp_c": 20}, {"t_sec": 5, "temp_c": 30}]}"#,
                "INVALID_END_BEHAVIOR",
            ),
            (
                r#"{"name": "a", "points": [{"t_sec": 0, "temp_c": 20}, {"t_sec": 5, "temp_c": 9000}]}"#,
                "TEMPERATURE_OUT_OF_RANGE",
            ),
        ];

        for (body, code) in cases {
            let response = send(&app, Method::POST, "/api/v0/profiles/save", Some(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", code);
            let json = body_json(response.into_body()).await;
            assert_eq!(json["status"], "error");
            assert_eq!(json["code"], code);
        }

        // Nothing was stored
        let response = send(&app, Method::GET, "/api/v0/profile/a/get", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_save_mistyped_fields_get_reason_codes() {
        let app = TestApp::new().await;
        let cases = [
            (
                r#"{"name": "a", "end_behavior": 5, "points": [{"t_sec": 0, "temp_c": 20}, {"t_sec": 5, "temp_c": 30}]}"#,
                "INVALID_END_BEHAVIOR",
            ),
            (
                r#"{"name": null, "points": [{"t_sec": 0, "temp_c": 20}, {"t_sec": 5, "temp_c": 30}]}"#,
                "EMPTY_NAME",
            ),
            (
                r#"{"name": "a", "points": [{"t_sec": 0, "temp_c": 20}, {"t_sec": "ten", "temp_c": 30}]}"#,
                "INSUFFICIENT_POINTS",
            ),
            (r#"{"name": "a", "points": ["#, "MALFORMED_BODY"),
        ];

        for (body, code) in cases {
            let response = send(&app, Method::POST, "/api/v0/profiles/save", Some(body)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", code);
            let json = body_json(response.into_body()).await;
            assert_eq!(json["status"], "error");
            assert_eq!(json["code"], code);
        }
    }

    #[tokio::test]
    async fn test_save_drops_point_with_unusable_coordinate() {
        let app = TestApp::new().await;
        let response = send(
            &app,
            Method::POST,
            "/api/v0/profiles/save",
            Some(
                r#"{"name": "fast", "points": [
                    {"t_sec": 0, "temp_c": 20},
                    {"t_sec": "ten", "temp_c": 30},
                    {"t_sec": 60, "temp_c": 200}
                ]}"#,
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["profile"]["points"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_missing_profile() {
        let app = TestApp::new().await;
        let response = send(&app, Method::GET, "/api/v0/profile/nope/get", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["code"], "PROFILE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let app = TestApp::new().await;

        let response = send(&app, Method::DELETE, "/api/v0/profile/anneal", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Method::DELETE, "/api/v0/profile/anneal", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, Method::GET, "/api/v0/profiles/list", None).await;
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["profiles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_preview_target() {
        let app = TestApp::new().await;

        let response = send(
            &app,
            Method::GET,
            "/api/v0/profile/bisque/target?elapsed=360",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response.into_body()).await;
        assert_eq!(json["data"]["temp_c"], 509.5);
        assert_eq!(json["data"]["finished"], false);

        let response = send(
            &app,
            Method::GET,
            "/api/v0/profile/anneal/target?elapsed=5000",
            None,
        )
        .await;
        let json = body_json(response.into_body()).await;
        assert!(json["data"]["temp_c"].is_null());
        assert_eq!(json["data"]["finished"], true);

        let response = send(
            &app,
            Method::GET,
            "/api/v0/profile/bisque/target?elapsed=NaN",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
