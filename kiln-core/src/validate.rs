//! Profile validation
//!
//! Turns a [`ProfileCandidate`] into a canonical [`Profile`] or reports the
//! first rule it breaks. Rules run in a fixed order:
//!
//! 1. trimmed name is non-empty
//! 2. at least two points with finite `t_sec` and `temp_c` remain
//! 3. no two points share a `t_sec`
//! 4. end behavior is known (missing means `hold_last`)
//! 5. no point has a negative `t_sec`
//! 6. every temperature is inside the configured limits, if any

use crate::error::ValidationError;
use crate::profile::{EndBehavior, Profile, ProfileCandidate, Setpoint};

/// Inclusive temperature range accepted for waypoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempLimits {
    pub min_c: f64,
    pub max_c: f64,
}

impl TempLimits {
    pub fn new(min_c: f64, max_c: f64) -> Self {
        Self { min_c, max_c }
    }

    pub fn contains(&self, temp_c: f64) -> bool {
        temp_c >= self.min_c && temp_c <= self.max_c
    }
}

/// Validator with optional temperature limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileValidator {
    limits: Option<TempLimits>,
}

impl ProfileValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: TempLimits) -> Self {
        Self {
            limits: Some(limits),
        }
    }

    pub fn limits(&self) -> Option<TempLimits> {
        self.limits
    }

    pub fn validate(&self, candidate: &ProfileCandidate) -> Result<Profile, ValidationError> {
        let name = candidate.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let mut points: Vec<Setpoint> = candidate
            .points
            .iter()
            .filter_map(|p| match (p.t_sec, p.temp_c) {
                (Some(t), Some(temp)) if t.is_finite() && temp.is_finite() => {
                    Some(Setpoint::new(t, temp))
                }
                _ => None,
            })
            .collect();

        if points.len() < 2 {
            return Err(ValidationError::InsufficientPoints {
                found: points.len(),
            });
        }

        // All values are finite here, so total_cmp agrees with numeric order.
        points.sort_by(|a, b| a.t_sec.total_cmp(&b.t_sec));

        if let Some(pair) = points.windows(2).find(|w| w[0].t_sec == w[1].t_sec) {
            return Err(ValidationError::DuplicateTime { t_sec: pair[0].t_sec });
        }

        let end_behavior = match candidate.end_behavior.as_deref() {
            None => EndBehavior::default(),
            Some(s) => s.parse()?,
        };

        if let Some(first) = points.first().filter(|p| p.t_sec < 0.0) {
            return Err(ValidationError::NegativeTime { t_sec: first.t_sec });
        }

        if let Some(limits) = self.limits {
            if let Some(p) = points.iter().find(|p| !limits.contains(p.temp_c)) {
                return Err(ValidationError::TemperatureOutOfRange {
                    t_sec: p.t_sec,
                    temp_c: p.temp_c,
                    min_c: limits.min_c,
                    max_c: limits.max_c,
                });
            }
        }

        Ok(Profile {
            name: name.to_string(),
            points,
            end_behavior,
        })
    }

    /// Re-check an already constructed profile, e.g. one loaded from disk.
    pub fn revalidate(&self, profile: &Profile) -> Result<Profile, ValidationError> {
        self.validate(&ProfileCandidate::from(profile))
    }
}

/// Validate without temperature limits.
pub fn validate(candidate: &ProfileCandidate) -> Result<Profile, ValidationError> {
    ProfileValidator::new().validate(candidate)
}
