//! Shutdown handling for graceful daemon termination
//!
//! The element must never stay energized once the daemon stops driving it,
//! so any run in progress is stopped and the actuator is switched off before
//! the process exits.

use crate::controller::Engine;
use kiln_core::RunStatus;
use std::sync::Arc;
use tracing::{info, warn};

/// Stop any active run and leave the actuator de-energized.
pub async fn de_energize(engine: &Arc<Engine>) {
    let before = engine.snapshot();
    if before.status == RunStatus::Running {
        warn!(
            "Shutting down during run '{}', stopping it",
            before.active_profile.as_deref().unwrap_or("-")
        );
    }

    engine.shutdown().await;
    info!("Actuator de-energized");
}
