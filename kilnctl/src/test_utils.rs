//! Test utilities for CLI testing
//!
//! Provides an in-process mock server speaking the daemon's REST API. It runs
//! the real profile validator, interpolator and run state machine from
//! `kiln-core`; only the oven itself is faked.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use kiln_core::api::{
    ApiResponse, InfoResponse, ProfileListResponse, RunRequest, RunResponse,
    SingleProfileResponse, StatusResponse, TargetResponse,
};
use kiln_core::config::ProfileData;
use kiln_core::{
    target_at, KilnError, ProfileCandidate, ProfileValidator, RunController, TempLimits,
};
use rand::Rng;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

/// Ambient reading reported by the fake thermocouple
const MOCK_AMBIENT_C: f64 = 20.0;

/// Mock server state
#[derive(Debug, Clone)]
pub struct MockServerState {
    /// Stored profiles
    pub profiles: Arc<Mutex<ProfileData>>,
    /// Run state machine
    pub controller: Arc<Mutex<RunController>>,
    /// Server info
    pub info: Arc<Mutex<InfoResponse>>,
}

impl Default for MockServerState {
    fn default() -> Self {
        let profiles = ProfileData::with_defaults();
        let info = InfoResponse {
            version: "1.0.0-test".to_string(),
            uptime: 3600,
            software: "Kiln Server v1.0.0-test".to_string(),
            tick_interval_ms: 1000,
            min_temp_c: -100.0,
            max_temp_c: 1300.0,
            plant: "mock".to_string(),
            profile_count: profiles.len(),
        };

        Self {
            profiles: Arc::new(Mutex::new(profiles)),
            controller: Arc::new(Mutex::new(RunController::new())),
            info: Arc::new(Mutex::new(info)),
        }
    }
}

impl MockServerState {
    fn validator(&self) -> ProfileValidator {
        let info = self.info.lock().unwrap();
        ProfileValidator::with_limits(TempLimits::new(info.min_temp_c, info.max_temp_c))
    }
}

/// Query parameters for target preview
#[derive(Debug, Deserialize)]
pub struct TargetQuery {
    elapsed: f64,
}

type MockError = (StatusCode, Json<ApiResponse<()>>);
type MockResult<T> = Result<Json<ApiResponse<T>>, MockError>;

fn fail(err: KilnError) -> MockError {
    let status = match &err {
        KilnError::Validation(_) | KilnError::InvalidProfile(_) => StatusCode::BAD_REQUEST,
        KilnError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
        KilnError::Faulted(_) | KilnError::NotFaulted => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiResponse::error_with_code(err.to_string(), err.code())),
    )
}

fn ok<T>(data: T) -> MockResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Mock server implementation
#[derive(Debug)]
pub struct MockServer {
    state: MockServerState,
    port: u16,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    /// Create a new mock server
    pub fn new() -> Self {
        Self {
            state: MockServerState::default(),
            port: 0, // Will be assigned when server starts
        }
    }

    /// Start the mock server and return the address
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = self.create_router();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        // Give the server a moment to start and verify it's running
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
        }

        Ok((self, server_url))
    }

    /// Get the server port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the server state
    pub fn state(&self) -> &MockServerState {
        &self.state
    }

    /// Latch a fault as the daemon's safety checks would.
    pub fn inject_fault(&self, reason: &str) {
        self.state.controller.lock().unwrap().fault(reason);
    }

    /// Create the mock server router
    fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/api/v0/info", get(info_handler))
            .route("/api/v0/status", get(status_handler))
            .route("/api/v0/profiles/list", get(list_profiles_handler))
            .route("/api/v0/profiles/save", post(save_profile_handler))
            .route("/api/v0/profile/:name/get", get(get_profile_handler))
            .route("/api/v0/profile/:name/target", get(target_handler))
            .route("/api/v0/profile/:name", delete(delete_profile_handler))
            .route("/api/v0/run", post(run_handler))
            .route("/api/v0/stop", post(stop_handler))
            .route("/api/v0/fault/ack", post(ack_handler))
            .with_state(self.state.clone())
    }
}

// Handler functions

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    let data = serde_json::json!({
        "service": "Kiln Controller API Server",
        "status": "ok",
        "version": "1.0.0-test"
    });
    Json(ApiResponse::success(data))
}

async fn info_handler(State(state): State<MockServerState>) -> MockResult<InfoResponse> {
    let mut info = state.info.lock().unwrap().clone();
    info.profile_count = state.profiles.lock().unwrap().len();
    ok(info)
}

/// Each poll counts as one tick with a slightly noisy ambient reading.
async fn status_handler(State(state): State<MockServerState>) -> MockResult<StatusResponse> {
    let jitter = rand::thread_rng().gen_range(-0.5..0.5);
    let mut controller = state.controller.lock().unwrap();
    controller.record_sample(Some(MOCK_AMBIENT_C + jitter), true);
    controller.tick(Instant::now()).map_err(fail)?;
    ok(controller.snapshot())
}

async fn list_profiles_handler(
    State(state): State<MockServerState>,
) -> MockResult<ProfileListResponse> {
    let profiles = state.profiles.lock().unwrap().summaries();
    ok(ProfileListResponse { profiles })
}

async fn get_profile_handler(
    State(state): State<MockServerState>,
    Path(name): Path<String>,
) -> MockResult<SingleProfileResponse> {
    let profile = state
        .profiles
        .lock()
        .unwrap()
        .get(&name)
        .cloned()
        .ok_or_else(|| fail(KilnError::ProfileNotFound(name)))?;
    ok(SingleProfileResponse { profile })
}

async fn save_profile_handler(
    State(state): State<MockServerState>,
    Json(candidate): Json<ProfileCandidate>,
) -> MockResult<SingleProfileResponse> {
    let profile = state
        .validator()
        .validate(&candidate)
        .map_err(|e| fail(e.into()))?;
    state.profiles.lock().unwrap().insert(profile.clone());
    ok(SingleProfileResponse { profile })
}

async fn delete_profile_handler(
    State(state): State<MockServerState>,
    Path(name): Path<String>,
) -> MockResult<()> {
    state
        .profiles
        .lock()
        .unwrap()
        .remove(&name)
        .ok_or_else(|| fail(KilnError::ProfileNotFound(name.clone())))?;
    state.controller.lock().unwrap().forget(&name);
    ok(())
}

async fn target_handler(
    State(state): State<MockServerState>,
    Path(name): Path<String>,
    Query(query): Query<TargetQuery>,
) -> MockResult<TargetResponse> {
    if !query.elapsed.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Elapsed time must be finite".to_string())),
        ));
    }
    let profile = state
        .profiles
        .lock()
        .unwrap()
        .get(&name)
        .cloned()
        .ok_or_else(|| fail(KilnError::ProfileNotFound(name)))?;
    let target = target_at(&profile, query.elapsed).map_err(fail)?;
    ok(TargetResponse {
        profile: profile.name,
        elapsed_sec: query.elapsed,
        temp_c: target.temp_c,
        finished: target.finished,
    })
}

async fn run_handler(
    State(state): State<MockServerState>,
    Json(request): Json<RunRequest>,
) -> MockResult<RunResponse> {
    let profiles = state.profiles.lock().unwrap();
    let mut controller = state.controller.lock().unwrap();
    let profile = controller
        .run(request.profile_id.as_deref(), &*profiles, Instant::now())
        .map_err(fail)?
        .name
        .clone();
    ok(RunResponse {
        profile,
        started_at: controller.snapshot().started_at,
    })
}

async fn stop_handler(State(state): State<MockServerState>) -> MockResult<StatusResponse> {
    let mut controller = state.controller.lock().unwrap();
    controller.stop();
    ok(controller.snapshot())
}

async fn ack_handler(State(state): State<MockServerState>) -> MockResult<StatusResponse> {
    let mut controller = state.controller.lock().unwrap();
    controller.acknowledge().map_err(fail)?;
    ok(controller.snapshot())
}
