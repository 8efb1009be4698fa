//! Setpoint interpolation
//!
//! Maps elapsed run time to a target temperature. Between waypoints the
//! target is linear; before the first waypoint it is the first temperature;
//! from the last waypoint on the run is finished and the [`EndBehavior`]
//! decides whether a target remains.

use serde::{Deserialize, Serialize};

use crate::error::{KilnError, Result};
use crate::profile::{EndBehavior, Profile};

/// Interpolator output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Target temperature, absent once a `return_idle` profile has finished
    pub temp_c: Option<f64>,
    /// Whether the last waypoint has been reached
    pub finished: bool,
}

/// Target temperature for `profile` at `elapsed_sec` seconds into the run.
pub fn target_at(profile: &Profile, elapsed_sec: f64) -> Result<Target> {
    let points = &profile.points;
    if points.len() < 2 {
        return Err(KilnError::InvalidProfile(format!(
            "'{}' has {} point(s), need at least 2",
            profile.name,
            points.len()
        )));
    }
    if !elapsed_sec.is_finite() {
        return Err(KilnError::InvalidProfile(format!(
            "elapsed time must be finite, got {}",
            elapsed_sec
        )));
    }

    let first = points[0];
    let last = points[points.len() - 1];

    if elapsed_sec >= last.t_sec {
        let temp_c = match profile.end_behavior {
            EndBehavior::HoldLast => Some(last.temp_c),
            EndBehavior::ReturnIdle => None,
        };
        return Ok(Target {
            temp_c,
            finished: true,
        });
    }

    if elapsed_sec <= first.t_sec {
        return Ok(Target {
            temp_c: Some(first.temp_c),
            finished: false,
        });
    }

    // First index whose time is past elapsed; its predecessor brackets from below.
    let upper = points.partition_point(|p| p.t_sec <= elapsed_sec);
    let (p1, p2) = (points[upper - 1], points[upper]);

    let temp_c = if elapsed_sec == p1.t_sec {
        p1.temp_c
    } else {
        let ratio = (elapsed_sec - p1.t_sec) / (p2.t_sec - p1.t_sec);
        p1.temp_c + ratio * (p2.temp_c - p1.temp_c)
    };

    Ok(Target {
        temp_c: Some(temp_c),
        finished: false,
    })
}
