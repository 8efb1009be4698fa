//! Runtime configuration management
//!
//! Combines static configuration with the mutable profile store, providing
//! thread-safe access and atomic save operations.

use kiln_core::{
    config::{ProfileData, StaticConfig},
    KilnError, Profile, ProfileCandidate, ProfileValidator, Result,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

const PROFILES_FILE: &str = "profiles.toml";

/// Runtime configuration combining static config and mutable data.
///
/// Static config is read once at startup and remains immutable. Profiles
/// can be modified via API; every change is written to disk before it
/// becomes visible.
pub(crate) struct RuntimeConfig {
    /// Static configuration (immutable after load)
    static_config: StaticConfig,

    /// Validator configured with the control temperature limits
    validator: ProfileValidator,

    /// Profile data with independent locking
    profiles: RwLock<ProfileData>,
}

impl RuntimeConfig {
    /// Load all configuration from disk.
    ///
    /// If config file doesn't exist, creates with defaults.
    /// If data directory doesn't exist, creates it.
    /// If the profiles file doesn't exist, creates it with default profiles.
    /// Stored profiles are re-validated; an invalid entry is a configuration error.
    pub async fn load(config_path: &Path) -> Result<Self> {
        info!("Loading configuration from: {}", config_path.display());

        let static_config = Self::load_static_config(config_path).await?;
        static_config
            .control
            .validate()
            .map_err(KilnError::Config)?;
        static_config
            .simulation
            .validate()
            .map_err(KilnError::Config)?;

        Self::ensure_data_dir(&static_config.data_dir).await?;

        let validator = ProfileValidator::with_limits(static_config.control.limits());
        let profiles = Self::load_profiles(&static_config.data_dir, &validator).await?;

        info!("Configuration loaded: {} profiles", profiles.len());

        Ok(Self {
            static_config,
            validator,
            profiles: RwLock::new(profiles),
        })
    }

    /// Load static config from TOML file, creating with defaults if missing.
    async fn load_static_config(path: &Path) -> Result<StaticConfig> {
        if !path.exists() {
            info!(
                "Static config not found at {}. Creating with defaults.",
                path.display()
            );

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    KilnError::Config(format!(
                        "Failed to create config directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }

            let config = StaticConfig::default();
            let toml_str = config
                .to_toml()
                .map_err(|e| KilnError::Config(format!("Failed to serialize config: {}", e)))?;

            fs::write(path, &toml_str)
                .await
                .map_err(|e| KilnError::Config(format!("Failed to write config file: {}", e)))?;

            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| KilnError::Config(format!("Failed to read config file: {}", e)))?;

        StaticConfig::from_toml(&content)
            .map_err(|e| KilnError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Ensure data directory exists and is writable.
    async fn ensure_data_dir(data_dir: &Path) -> Result<()> {
        if !data_dir.exists() {
            info!("Creating data directory: {}", data_dir.display());
            fs::create_dir_all(data_dir).await.map_err(|e| {
                KilnError::Config(format!(
                    "Failed to create data directory '{}': {}. \
                     Please create it manually or check permissions.",
                    data_dir.display(),
                    e
                ))
            })?;
        }

        let test_file = data_dir.join(".write_test");
        fs::write(&test_file, "test").await.map_err(|e| {
            KilnError::Config(format!(
                "Data directory '{}' is not writable: {}",
                data_dir.display(),
                e
            ))
        })?;
        let _ = fs::remove_file(&test_file).await;

        Ok(())
    }

    /// Load profiles from TOML file, creating with defaults if missing.
    async fn load_profiles(data_dir: &Path, validator: &ProfileValidator) -> Result<ProfileData> {
        let path = data_dir.join(PROFILES_FILE);

        if !path.exists() {
            debug!("Profiles file not found. Creating with defaults.");
            let data = ProfileData::with_defaults().validated(validator)?;
            Self::write_toml(&path, &Self::serialize(&data)?).await?;
            return Ok(data);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| KilnError::Config(format!("Failed to read profiles file: {}", e)))?;

        ProfileData::from_toml(&content)
            .map_err(|e| KilnError::Config(format!("Failed to parse profiles file: {}", e)))?
            .validated(validator)
    }

    fn serialize(data: &ProfileData) -> Result<String> {
        data.to_toml()
            .map_err(|e| KilnError::Config(format!("Failed to serialize profiles: {}", e)))
    }

    /// Write TOML content atomically (write to temp, then rename).
    async fn write_toml(path: &Path, content: &str) -> Result<()> {
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content)
            .await
            .map_err(|e| KilnError::Config(format!("Failed to write temp file: {}", e)))?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| KilnError::Config(format!("Failed to rename temp file: {}", e)))?;

        Ok(())
    }

    // =========================================================================
    // Static config access (read-only)
    // =========================================================================

    /// Get reference to static configuration.
    pub fn static_config(&self) -> &StaticConfig {
        &self.static_config
    }

    /// Get data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.static_config.data_dir
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir().join(PROFILES_FILE)
    }

    // =========================================================================
    // Profile access and modification
    // =========================================================================

    /// Get read lock on profile data.
    pub async fn profiles(&self) -> tokio::sync::RwLockReadGuard<'_, ProfileData> {
        self.profiles.read().await
    }

    /// Get a copy of a stored profile.
    pub async fn get_profile(&self, name: &str) -> Result<Profile> {
        self.profiles
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| KilnError::ProfileNotFound(name.to_string()))
    }

    /// Validate and upsert a profile.
    ///
    /// The file is rewritten before the in-memory store changes, so a failed
    /// write leaves both untouched. Returns the canonical profile and whether
    /// it replaced an existing one.
    pub async fn save_profile(&self, candidate: &ProfileCandidate) -> Result<(Profile, bool)> {
        let profile = self.validator.validate(candidate)?;

        let mut profiles = self.profiles.write().await;
        let mut next = profiles.clone();
        let replaced = next.insert(profile.clone()).is_some();

        Self::write_toml(&self.profiles_path(), &Self::serialize(&next)?).await?;
        *profiles = next;

        debug!("Saved profiles to {}", self.profiles_path().display());
        Ok((profile, replaced))
    }

    /// Delete a profile by name.
    pub async fn delete_profile(&self, name: &str) -> Result<Profile> {
        let mut profiles = self.profiles.write().await;
        let mut next = profiles.clone();
        let removed = next
            .remove(name)
            .ok_or_else(|| KilnError::ProfileNotFound(name.to_string()))?;

        Self::write_toml(&self.profiles_path(), &Self::serialize(&next)?).await?;
        *profiles = next;

        debug!("Saved profiles to {}", self.profiles_path().display());
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{CandidatePoint, EndBehavior, ValidationError};
    use tempfile::TempDir;

    /// Write a config whose data dir lives inside `temp_dir`.
    async fn create_test_config(temp_dir: &Path) -> PathBuf {
        let config_path = temp_dir.join("config.toml");
        let data_dir = temp_dir.join("data");

        let static_config = StaticConfig::with_data_dir(data_dir);
        fs::write(&config_path, static_config.to_toml().unwrap())
            .await
            .unwrap();
        config_path
    }

    fn candidate(name: &str, points: &[(f64, f64)], end: Option<&str>) -> ProfileCandidate {
        ProfileCandidate {
            name: name.to_string(),
            points: points
                .iter()
                .map(|&(t, temp)| CandidatePoint::new(t, temp))
                .collect(),
            end_behavior: end.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_runtime_config_load_creates_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        // Default data dir points outside the temp dir, so write the config first
        let config = RuntimeConfig::load(&create_test_config(temp_dir.path()).await)
            .await
            .unwrap();
        assert!(config.profiles_path().exists());
        assert!(config.profiles().await.contains("bisque"));

        // A missing static config is created
        assert!(!config_path.exists());
        let loaded = RuntimeConfig::load_static_config(&config_path).await.unwrap();
        assert!(config_path.exists());
        assert_eq!(loaded.server.port, 3000);
    }

    #[tokio::test]
    async fn test_save_get_roundtrip_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config(temp_dir.path()).await;
        let config = RuntimeConfig::load(&config_path).await.unwrap();

        let (saved, replaced) = config
            .save_profile(&candidate(
                "glaze",
                &[(600.0, 900.0), (0.0, 20.0), (1200.0, 900.0)],
                Some("return_idle"),
            ))
            .await
            .unwrap();
        assert!(!replaced);

        let fetched = config.get_profile("glaze").await.unwrap();
        assert_eq!(fetched, saved);
        assert_eq!(fetched.points[0].t_sec, 0.0);
        assert_eq!(fetched.end_behavior, EndBehavior::ReturnIdle);

        drop(config);
        let reloaded = RuntimeConfig::load(&config_path).await.unwrap();
        assert_eq!(reloaded.get_profile("glaze").await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config(temp_dir.path()).await;
        let config = RuntimeConfig::load(&config_path).await.unwrap();

        let (_, replaced) = config
            .save_profile(&candidate("bisque", &[(0.0, 20.0), (10.0, 30.0)], None))
            .await
            .unwrap();
        assert!(replaced);
        assert_eq!(config.get_profile("bisque").await.unwrap().points.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_save_leaves_store_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config(temp_dir.path()).await;
        let config = RuntimeConfig::load(&config_path).await.unwrap();
        let before = fs::read_to_string(config.profiles_path()).await.unwrap();

        let err = config
            .save_profile(&candidate("bisque", &[(0.0, 20.0), (0.0, 30.0)], None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KilnError::Validation(ValidationError::DuplicateTime { .. })
        ));

        // Over the configured max temperature
        let err = config
            .save_profile(&candidate("hot", &[(0.0, 20.0), (10.0, 5000.0)], None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KilnError::Validation(ValidationError::TemperatureOutOfRange { .. })
        ));

        assert_eq!(config.get_profile("bisque").await.unwrap().points.len(), 3);
        assert!(config.get_profile("hot").await.is_err());
        let after = fs::read_to_string(config.profiles_path()).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_delete_profile() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config(temp_dir.path()).await;
        let config = RuntimeConfig::load(&config_path).await.unwrap();

        config.delete_profile("anneal").await.unwrap();
        assert!(matches!(
            config.get_profile("anneal").await,
            Err(KilnError::ProfileNotFound(_))
        ));
        assert!(matches!(
            config.delete_profile("anneal").await,
            Err(KilnError::ProfileNotFound(_))
        ));

        drop(config);
        let reloaded = RuntimeConfig::load(&config_path).await.unwrap();
        assert!(!reloaded.profiles().await.contains("anneal"));
    }

    #[tokio::test]
    async fn test_invalid_profiles_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config(temp_dir.path()).await;
        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&data_dir).await.unwrap();
        fs::write(
            data_dir.join(PROFILES_FILE),
            r#"
[profiles.one]
name = "one"

[[profiles.one.points]]
t_sec = 0
temp_c = 20
"#,
        )
        .await
        .unwrap();

        assert!(matches!(
            RuntimeConfig::load(&config_path).await,
            Err(KilnError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_control_section_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        let content = format!(
            r#"data_dir = "{}"

[server]
hostname = "localhost"
port = 3000

[control]
min_temp_c = 100.0
max_temp_c = 50.0
"#,
            data_dir.to_string_lossy().replace('\\', "\\\\")
        );
        fs::write(&config_path, content).await.unwrap();

        assert!(matches!(
            RuntimeConfig::load(&config_path).await,
            Err(KilnError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_simulation_section_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        let content = format!(
            r#"data_dir = "{}"

[server]
hostname = "localhost"
port = 3000

[simulation]
noise_c = inf
"#,
            data_dir.to_string_lossy().replace('\\', "\\\\")
        );
        fs::write(&config_path, content).await.unwrap();

        match RuntimeConfig::load(&config_path).await {
            Err(KilnError::Config(message)) => assert!(message.contains("noise_c")),
            other => panic!("expected a config error, got {:?}", other.map(|_| ())),
        }
    }
}
