//! Ramp profile data - mutable via API
//!
//! Stored in `{data_dir}/profiles.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{KilnError, Result};
use crate::profile::{EndBehavior, Profile, ProfileSummary, Setpoint};
use crate::run::ProfileSource;
use crate::validate::ProfileValidator;

/// Profile data stored in profiles.toml
///
/// Maps profile names to their definitions. Ordered so listings are stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfileData {
    /// Create profile data with default profiles.
    ///
    /// The defaults are written out already canonical; loading re-validates
    /// them against the configured limits like any stored profile.
    pub fn with_defaults() -> Self {
        let mut data = Self::default();

        data.insert(Profile {
            name: "bisque".to_string(),
            points: vec![
                Setpoint::new(0.0, 20.0),
                Setpoint::new(60.0, 20.0),
                Setpoint::new(660.0, 999.0),
            ],
            end_behavior: EndBehavior::HoldLast,
        });
        data.insert(Profile {
            name: "anneal".to_string(),
            points: vec![
                Setpoint::new(0.0, 20.0),
                Setpoint::new(600.0, 500.0),
                Setpoint::new(1800.0, 500.0),
                Setpoint::new(3600.0, 20.0),
            ],
            end_behavior: EndBehavior::ReturnIdle,
        });

        data
    }

    /// Get a profile by name.
    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Insert or replace a profile under its own name.
    pub fn insert(&mut self, profile: Profile) -> Option<Profile> {
        self.profiles.insert(profile.name.clone(), profile)
    }

    /// Remove a profile by name.
    pub fn remove(&mut self, name: &str) -> Option<Profile> {
        self.profiles.remove(name)
    }

    /// Check if a profile exists.
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Get all profile names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.profiles.keys()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Summaries sorted by name.
    pub fn summaries(&self) -> Vec<ProfileSummary> {
        self.profiles.values().map(Profile::summary).collect()
    }

    /// Re-validate every stored profile, canonicalizing point order.
    ///
    /// Fails on the first invalid entry or on a key that does not match the
    /// profile's own name.
    pub fn validated(self, validator: &ProfileValidator) -> Result<Self> {
        let mut out = Self::default();
        for (key, profile) in self.profiles {
            let canonical = validator.revalidate(&profile).map_err(|e| {
                KilnError::Config(format!("Profile '{}' is invalid: {}", key, e))
            })?;
            if canonical.name != key {
                return Err(KilnError::Config(format!(
                    "Profile key '{}' does not match its name '{}'",
                    key, canonical.name
                )));
            }
            out.insert(canonical);
        }
        Ok(out)
    }

    /// Parse ProfileData from TOML string.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize ProfileData to TOML string.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl ProfileSource for ProfileData {
    fn lookup(&self, name: &str) -> Option<Profile> {
        self.get(name).cloned()
    }
}
