//! CLI configuration management
//!
//! Handles loading and saving CLI-specific configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_SERVER: &str = "KILN_SERVER";
const ENV_FORMAT: &str = "KILN_FORMAT";
const ENV_VERBOSE: &str = "KILN_VERBOSE";
const ENV_TIMEOUT: &str = "KILN_TIMEOUT";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Default server URL
    pub server_url: String,

    /// Default output format
    pub output_format: String,

    /// Enable verbose logging by default
    pub verbose: bool,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".to_string(),
            output_format: "table".to_string(),
            verbose: false,
            timeout: 10,
        }
    }
}

impl CliConfig {
    /// Load configuration from the default path, or defaults if it is missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read CLI config file {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse CLI config file {}", path.display()))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize CLI config")?;

        std::fs::write(path, content).context("Failed to write CLI config file")?;

        Ok(())
    }

    /// Get the configuration file path (`~/.config/kiln/cli.toml` on Linux)
    pub fn config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;

        Ok(config_dir.join("kiln").join("cli.toml"))
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for CLI configuration with validation and priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// Apply the layers in that order; each one overrides what came before.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    server_url: Option<String>,
    output_format: Option<String>,
    verbose: Option<bool>,
    timeout: Option<u64>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL (with validation)
    pub fn with_server_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        Self::validate_url(&url)?;
        self.server_url = Some(url);
        Ok(self)
    }

    /// Set output format (with validation)
    pub fn with_output_format(mut self, format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        Self::validate_output_format(&format)?;
        self.output_format = Some(format);
        Ok(self)
    }

    /// Set verbose flag
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Set timeout (with validation)
    pub fn with_timeout(mut self, timeout: u64) -> Result<Self> {
        Self::validate_timeout(timeout)?;
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Load the default configuration file, unless `load_file` is false.
    ///
    /// A missing or unreadable file leaves the builder unchanged.
    pub fn with_config_file(self, load_file: bool) -> Result<Self> {
        if !load_file {
            return Ok(self);
        }

        match CliConfig::config_path() {
            Ok(path) => self.with_config_file_at(&path),
            Err(_) => Ok(self),
        }
    }

    /// Load an explicit configuration file. Unlike the default file, an
    /// unreadable or invalid explicit file is an error.
    pub fn with_config_file_at(self, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(self);
        }

        let config = CliConfig::load_from(path)?;
        Self::validate_url(&config.server_url)?;
        Self::validate_output_format(&config.output_format)?;
        Self::validate_timeout(config.timeout)?;

        Ok(Self {
            server_url: Some(config.server_url),
            output_format: Some(config.output_format),
            verbose: Some(config.verbose),
            timeout: Some(config.timeout),
        })
    }

    /// Apply `KILN_*` environment variables. Invalid values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(server_url) = std::env::var(ENV_SERVER) {
            if Self::validate_url(&server_url).is_ok() {
                self.server_url = Some(server_url);
            }
        }

        if let Ok(format) = std::env::var(ENV_FORMAT) {
            if Self::validate_output_format(&format).is_ok() {
                self.output_format = Some(format);
            }
        }

        if let Ok(verbose) = std::env::var(ENV_VERBOSE) {
            self.verbose = Some(verbose.to_lowercase() == "true" || verbose == "1");
        }

        if let Ok(timeout) = std::env::var(ENV_TIMEOUT) {
            if let Ok(timeout) = timeout.parse() {
                if Self::validate_timeout(timeout).is_ok() {
                    self.timeout = Some(timeout);
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<CliConfig> {
        let defaults = CliConfig::default();

        let server_url = self.server_url.unwrap_or(defaults.server_url);
        let output_format = self.output_format.unwrap_or(defaults.output_format);
        let timeout = self.timeout.unwrap_or(defaults.timeout);

        Self::validate_url(&server_url)?;
        Self::validate_output_format(&output_format)?;
        Self::validate_timeout(timeout)?;

        Ok(CliConfig {
            server_url,
            output_format,
            verbose: self.verbose.unwrap_or(defaults.verbose),
            timeout,
        })
    }

    /// Validate URL format
    pub(crate) fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(anyhow::anyhow!("Server URL cannot be empty"));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "Server URL must start with http:// or https://"
            ));
        }

        Ok(())
    }

    /// Validate output format
    pub(crate) fn validate_output_format(format: &str) -> Result<()> {
        match format {
            "table" | "json" => Ok(()),
            _ => Err(anyhow::anyhow!(
                "Invalid output format '{}'. Must be 'table' or 'json'",
                format
            )),
        }
    }

    /// Validate timeout value
    pub(crate) fn validate_timeout(timeout: u64) -> Result<()> {
        if timeout == 0 {
            return Err(anyhow::anyhow!("Timeout must be greater than 0"));
        }

        if timeout > 300 {
            return Err(anyhow::anyhow!(
                "Timeout must be less than or equal to 300 seconds"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [ENV_SERVER, ENV_FORMAT, ENV_VERBOSE, ENV_TIMEOUT] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.output_format, "table");
        assert!(!config.verbose);
        assert_eq!(config.timeout, 10);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cli.toml");

        let config = CliConfig {
            server_url: "http://kiln.local:3000".to_string(),
            timeout: 30,
            ..CliConfig::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(CliConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        std::fs::write(&path, "timeout = 42\n").unwrap();

        let config = CliConfig::load_from(&path).unwrap();
        assert_eq!(config.timeout, 42);
        assert_eq!(config.server_url, "http://localhost:3000");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_builder_url_validation() {
        assert!(ConfigBuilder::new().with_server_url("").is_err());
        assert!(ConfigBuilder::new()
            .with_server_url("ftp://example.com")
            .is_err());
        assert!(ConfigBuilder::new()
            .with_server_url("https://example.com")
            .is_ok());
    }

    #[test]
    fn test_builder_format_and_timeout_validation() {
        assert!(ConfigBuilder::new().with_output_format("xml").is_err());
        assert!(ConfigBuilder::new().with_output_format("json").is_ok());

        assert!(ConfigBuilder::new().with_timeout(0).is_err());
        assert!(ConfigBuilder::new().with_timeout(301).is_err());
        assert!(ConfigBuilder::new().with_timeout(300).is_ok());
    }

    #[test]
    fn test_invalid_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        std::fs::write(&path, "output_format = \"xml\"\n").unwrap();

        assert!(ConfigBuilder::new().with_config_file_at(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_builder_with_env_overrides() {
        clear_env();
        std::env::set_var(ENV_SERVER, "http://env.example.com:9000");
        std::env::set_var(ENV_FORMAT, "json");
        std::env::set_var(ENV_VERBOSE, "1");
        std::env::set_var(ENV_TIMEOUT, "25");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        assert_eq!(config.server_url, "http://env.example.com:9000");
        assert_eq!(config.output_format, "json");
        assert!(config.verbose);
        assert_eq!(config.timeout, 25);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_builder_priority_chain() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.toml");
        std::fs::write(
            &path,
            "server_url = \"http://file.example.com\"\ntimeout = 15\noutput_format = \"json\"\n",
        )
        .unwrap();

        std::env::set_var(ENV_SERVER, "http://env.example.com:9000");
        std::env::set_var(ENV_TIMEOUT, "25");

        let config = ConfigBuilder::new()
            .with_config_file_at(&path)
            .unwrap()
            .with_env_overrides()
            .with_server_url("http://cli.example.com:7000")
            .unwrap()
            .build()
            .unwrap();

        // CLI beats env, env beats file, file beats defaults
        assert_eq!(config.server_url, "http://cli.example.com:7000");
        assert_eq!(config.timeout, 25);
        assert_eq!(config.output_format, "json");
        assert!(!config.verbose);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_builder_invalid_env_values_ignored() {
        clear_env();
        std::env::set_var(ENV_TIMEOUT, "invalid");
        std::env::set_var(ENV_FORMAT, "xml");

        let config = ConfigBuilder::new().with_env_overrides().build().unwrap();

        assert_eq!(config.timeout, 10);
        assert_eq!(config.output_format, "table");

        clear_env();
    }
}
