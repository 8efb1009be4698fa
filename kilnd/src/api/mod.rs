//! API module for the kiln daemon
//!
//! Contains the REST API implementation with Axum router and handlers.

pub(crate) mod handlers;

use crate::config::RuntimeConfig;
use crate::controller::Engine;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    /// Runtime configuration (static config + profile store)
    pub config: Arc<RuntimeConfig>,
    /// Control loop
    pub engine: Arc<Engine>,
    /// Server start time for uptime calculation
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Arc<RuntimeConfig>, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            start_time: Instant::now(),
        }
    }
}

/// Create the main API router with all endpoints
pub(crate) fn create_router(state: AppState) -> Router {
    info!("Setting up API router...");

    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024)); // 1MB limit

    Router::new()
        // Status
        .route("/api/v0/status", get(handlers::status::get_status))
        // Profile endpoints
        .route(
            "/api/v0/profiles/list",
            get(handlers::profiles::list_profiles),
        )
        .route(
            "/api/v0/profiles/save",
            post(handlers::profiles::save_profile),
        )
        .route(
            "/api/v0/profile/:name/get",
            get(handlers::profiles::get_profile),
        )
        .route(
            "/api/v0/profile/:name/target",
            get(handlers::profiles::preview_target),
        )
        .route(
            "/api/v0/profile/:name",
            delete(handlers::profiles::delete_profile),
        )
        // Run control
        .route("/api/v0/run", post(handlers::run::start_run))
        .route("/api/v0/stop", post(handlers::run::stop_run))
        .route("/api/v0/fault/ack", post(handlers::run::acknowledge_fault))
        // System info endpoint
        .route("/api/v0/info", get(handlers::info::get_info))
        // Root endpoint
        .route("/", get(handlers::info::root))
        .layer(middleware_stack)
        .with_state(state)
}

/// Error handling utilities
pub(crate) mod error {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use kiln_core::{api::ApiResponse, KilnError};

    use tracing::{error, warn};

    /// Custom error type for API responses
    #[derive(Debug)]
    pub struct ApiError {
        pub status_code: StatusCode,
        pub message: String,
        pub code: Option<&'static str>,
    }

    impl ApiError {
        /// Create a new API error
        pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
                code: None,
            }
        }

        /// Attach a stable reason code
        pub fn with_code(mut self, code: &'static str) -> Self {
            self.code = Some(code);
            self
        }

        /// Create a bad request error
        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        /// Create a not found error
        pub fn not_found(message: impl Into<String>) -> Self {
            Self::new(StatusCode::NOT_FOUND, message)
        }

        /// Create a conflict error (request clashes with controller state)
        pub fn conflict(message: impl Into<String>) -> Self {
            Self::new(StatusCode::CONFLICT, message)
        }

        /// Create an internal server error
        pub fn internal_error(message: impl Into<String>) -> Self {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }

        /// Create a service unavailable error (for plant issues)
        pub fn service_unavailable(message: impl Into<String>) -> Self {
            Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            if self.status_code.is_server_error() {
                error!("API Error {}: {}", self.status_code, self.message);
            } else {
                warn!("API Error {}: {}", self.status_code, self.message);
            }

            let response: ApiResponse<()> = match self.code {
                Some(code) => ApiResponse::error_with_code(self.message, code),
                None => ApiResponse::error(self.message),
            };

            (self.status_code, Json(response)).into_response()
        }
    }

    /// Convert KilnError to ApiError
    impl From<KilnError> for ApiError {
        fn from(err: KilnError) -> Self {
            let code = err.code();
            let message = err.to_string();
            let api_error = match err {
                KilnError::Validation(_) | KilnError::InvalidProfile(_) => {
                    Self::bad_request(message)
                }
                KilnError::ProfileNotFound(_) => Self::not_found(message),
                KilnError::Faulted(_) | KilnError::NotFaulted => Self::conflict(message),
                KilnError::ActuatorFault(_) => Self::service_unavailable(message),
                _ => Self::internal_error(message),
            };
            api_error.with_code(code)
        }
    }
}

/// Helper macros for common responses
#[macro_export]
macro_rules! api_ok {
    ($data:expr) => {
        Ok(axum::Json(kiln_core::api::ApiResponse::success($data)))
    };
}

#[macro_export]
macro_rules! api_fail {
    ($message:expr) => {
        $crate::api_fail!($message, "BAD_REQUEST")
    };
    ($message:expr, $code:expr) => {
        Err($crate::api::error::ApiError::bad_request($message).with_code($code))
    };
}
