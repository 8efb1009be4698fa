//! Ramp profile data model
//!
//! A [`Profile`] is an ordered list of time/temperature waypoints plus an
//! [`EndBehavior`] that decides what happens once the last waypoint is reached.
//! Profiles are only constructed through the validator; operator input arrives
//! as a [`ProfileCandidate`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::validate::validate;

/// A waypoint: at `t_sec` seconds into the run the target is `temp_c`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    /// Seconds since run start
    pub t_sec: f64,
    /// Target temperature in Celsius
    pub temp_c: f64,
}

impl Setpoint {
    /// Create a new setpoint.
    pub fn new(t_sec: f64, temp_c: f64) -> Self {
        Self { t_sec, temp_c }
    }
}

/// What the controller does after the last waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndBehavior {
    /// Keep targeting the last waypoint's temperature
    #[default]
    HoldLast,
    /// End the run and return to idle
    #[serde(alias = "stop")]
    ReturnIdle,
}

impl EndBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndBehavior::HoldLast => "hold_last",
            EndBehavior::ReturnIdle => "return_idle",
        }
    }
}

impl fmt::Display for EndBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EndBehavior {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hold_last" => Ok(EndBehavior::HoldLast),
            "return_idle" | "stop" => Ok(EndBehavior::ReturnIdle),
            _ => Err(ValidationError::InvalidEndBehavior(s.to_string())),
        }
    }
}

/// A validated ramp profile.
///
/// Invariants: `name` is trimmed and non-empty, `points` has at least two
/// entries sorted strictly ascending by `t_sec`, all values are finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub points: Vec<Setpoint>,
    #[serde(default)]
    pub end_behavior: EndBehavior,
}

impl Profile {
    /// Time of the last waypoint, i.e. the length of the ramp in seconds.
    pub fn duration_sec(&self) -> f64 {
        self.points.last().map(|p| p.t_sec).unwrap_or(0.0)
    }

    /// Summary row used by profile listings.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            point_count: self.points.len(),
            end_behavior: self.end_behavior,
            duration_sec: self.duration_sec(),
        }
    }
}

/// Listing entry for a stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub name: String,
    pub point_count: usize,
    pub end_behavior: EndBehavior,
    pub duration_sec: f64,
}

/// Point as submitted by an operator; either coordinate may be missing.
///
/// A coordinate that is not a JSON number deserializes to `None`, so the
/// validator drops the point instead of the whole request failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidatePoint {
    #[serde(default, deserialize_with = "lenient_number")]
    pub t_sec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub temp_c: Option<f64>,
}

impl CandidatePoint {
    pub fn new(t_sec: f64, temp_c: f64) -> Self {
        Self {
            t_sec: Some(t_sec),
            temp_c: Some(temp_c),
        }
    }
}

/// Unvalidated profile input, typically the body of a save request.
///
/// Deserialization never rejects a field for its type: a non-string name
/// reads as empty, a non-list `points` as no points, and a non-string
/// `end_behavior` keeps its JSON text so the validator reports it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileCandidate {
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_points")]
    pub points: Vec<CandidatePoint>,
    #[serde(
        default,
        deserialize_with = "lenient_end_behavior",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_behavior: Option<String>,
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_f64())
}

fn lenient_name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(name) => name,
        _ => String::new(),
    })
}

fn lenient_points<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<CandidatePoint>, D::Error> {
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .map(|item| CandidatePoint {
            t_sec: item.get("t_sec").and_then(Value::as_f64),
            temp_c: item.get("temp_c").and_then(Value::as_f64),
        })
        .collect())
}

fn lenient_end_behavior<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(end) => Some(end),
        other => Some(other.to_string()),
    })
}

impl From<&Profile> for ProfileCandidate {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            points: profile
                .points
                .iter()
                .map(|p| CandidatePoint::new(p.t_sec, p.temp_c))
                .collect(),
            end_behavior: Some(profile.end_behavior.as_str().to_string()),
        }
    }
}

/// In-memory editor for a profile; `build()` runs the validator.
#[derive(Debug, Clone, Default)]
pub struct ProfileBuilder {
    candidate: ProfileCandidate,
}

impl ProfileBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            candidate: ProfileCandidate {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Start editing an existing profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            candidate: profile.into(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.candidate.name = name.into();
        self
    }

    pub fn point(mut self, t_sec: f64, temp_c: f64) -> Self {
        self.candidate.points.push(CandidatePoint::new(t_sec, temp_c));
        self
    }

    pub fn points(mut self, points: impl IntoIterator<Item = Setpoint>) -> Self {
        self.candidate
            .points
            .extend(points.into_iter().map(|p| CandidatePoint::new(p.t_sec, p.temp_c)));
        self
    }

    /// Remove every point at `t_sec`.
    pub fn remove_point(mut self, t_sec: f64) -> Self {
        self.candidate.points.retain(|p| p.t_sec != Some(t_sec));
        self
    }

    pub fn end_behavior(mut self, end_behavior: EndBehavior) -> Self {
        self.candidate.end_behavior = Some(end_behavior.as_str().to_string());
        self
    }

    pub fn candidate(&self) -> &ProfileCandidate {
        &self.candidate
    }

    pub fn build(self) -> Result<Profile, ValidationError> {
        validate(&self.candidate)
    }
}

/// Parse points from CLI format: "0:20,60:20,660:999" (`seconds:celsius`).
///
/// Order is preserved; sorting and duplicate checks belong to the validator.
pub fn parse_points(input: &str) -> Result<Vec<Setpoint>, String> {
    let mut points = Vec::new();

    for pair in input.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (t, temp) = pair
            .split_once(':')
            .ok_or_else(|| format!("Invalid point format '{}': expected 'seconds:temp'", pair))?;

        let t_sec: f64 = t
            .trim()
            .parse()
            .map_err(|_| format!("Invalid time '{}': must be a number of seconds", t.trim()))?;
        let temp_c: f64 = temp
            .trim()
            .parse()
            .map_err(|_| format!("Invalid temperature '{}': must be a number", temp.trim()))?;

        points.push(Setpoint::new(t_sec, temp_c));
    }

    if points.is_empty() {
        return Err("No points given".to_string());
    }

    Ok(points)
}
