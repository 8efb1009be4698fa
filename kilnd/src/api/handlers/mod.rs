//! API request handlers for the kiln daemon REST API.
//!
//! # Handler Modules
//!
//! - [`info`] - System information and root endpoint
//! - [`status`] - Run state snapshot
//! - [`profiles`] - Ramp profile management and target preview
//! - [`run`] - Start, stop and fault acknowledgement
//!
//! All handlers accept `State<AppState>`, return
//! `Result<Json<ApiResponse<T>>, ApiError>`, and log through `tracing`.

pub mod info;
pub mod profiles;
pub mod run;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{body::Body, Router};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::api::{create_router, AppState};
    use crate::config::RuntimeConfig;
    use crate::controller::{Engine, SimulatedPlant};
    use kiln_core::SimulationConfig;

    pub(crate) struct TestApp {
        pub state: AppState,
        _config_dir: TempDir,
    }

    impl TestApp {
        pub async fn new() -> Self {
            Self::with_simulation(SimulationConfig {
                noise_c: 0.0,
                ..Default::default()
            })
            .await
        }

        pub async fn with_simulation(simulation: SimulationConfig) -> Self {
            let config_dir = tempfile::tempdir().unwrap();

            let data_dir = config_dir.path().join("data");
            std::fs::create_dir_all(&data_dir).unwrap();

            let data_dir_str = data_dir.to_string_lossy().replace('\\', "\\\\");
            let config_content = format!(
                r#"data_dir = "{}"

[server]
hostname = "localhost"
port = 3000

[control]
tick_interval_ms = 1000
max_temp_c = 1300.0
"#,
                data_dir_str
            );

            let config_path = config_dir.path().join("config.toml");
            std::fs::write(&config_path, config_content).unwrap();

            let config = RuntimeConfig::load(&config_path).await.unwrap();
            let plant = SimulatedPlant::new(simulation);
            let engine = Engine::new(Box::new(plant), &config.static_config().control);

            TestApp {
                state: AppState::new(Arc::new(config), Arc::new(engine)),
                _config_dir: config_dir,
            }
        }

        pub fn router(&self) -> Router {
            create_router(self.state.clone())
        }
    }

    pub(crate) async fn body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
