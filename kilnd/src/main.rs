//! Kiln Server
//!
//! REST API server for running firing profiles against a kiln.
//!
//! The control loop ticks on its own task; HTTP handlers only issue commands
//! to it and read the last published snapshot. The plant is simulated: it
//! models a heating element and thermal losses so the whole loop can be
//! exercised without hardware.

mod api;
mod config;
mod controller;
mod shutdown;

use anyhow::Result;
use api::AppState;
use clap::Parser;
use config::RuntimeConfig;
use controller::{Engine, SimulatedPlant};
use kiln_core::default_config_path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Kiln API Server
#[derive(Parser, Debug)]
#[command(name = "kilnd")]
#[command(version, about = "Kiln Controller API Server", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("Kiln Server starting...");

    // Determine config path: CLI flag > env var > default
    let config_path = args.config.unwrap_or_else(|| {
        std::env::var("KILN_SERVER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    });
    info!("Configuration file: {}", config_path.display());

    let runtime_config = RuntimeConfig::load(&config_path).await?;
    info!("Configuration loaded successfully");
    info!("  Data directory: {}", runtime_config.data_dir().display());
    info!(
        "  Profiles: {} stored in {}",
        runtime_config.profiles().await.len(),
        runtime_config.profiles_path().display()
    );

    let static_config = runtime_config.static_config();
    let port = args.port.unwrap_or(static_config.server.port);
    let bind_addr = format!("{}:{}", args.bind, port);

    let control = &static_config.control;
    info!(
        "Temperature limits: {:.1}°C .. {:.1}°C",
        control.min_temp_c, control.max_temp_c
    );
    if !static_config.simulation.run_switch {
        warn!("Simulated run switch is off: the element will not be energized");
    }

    let plant = SimulatedPlant::new(static_config.simulation.clone());
    let engine = Arc::new(Engine::new(Box::new(plant), control));
    let control_loop = engine.clone().start();

    let runtime_config = Arc::new(runtime_config);
    let engine_for_shutdown = engine.clone();

    let app_state = AppState::new(runtime_config, engine);
    let app = api::create_router(app_state);

    info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Kiln API Server listening on {}", bind_addr);
    info!("Server ready!");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown::de_energize(&engine_for_shutdown).await;
        })
        .await?;

    control_loop.abort();
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
