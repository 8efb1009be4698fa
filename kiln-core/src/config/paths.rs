//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use std::path::PathBuf;

/// Returns the default path for the static configuration file.
///
/// - Linux/macOS: `~/.config/kiln/config.toml`
/// - Fallback: `/etc/kiln/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("kiln")
        .join("config.toml")
}

/// Returns the default data directory for profiles.
///
/// - Linux/macOS: `~/.local/share/kiln`
/// - Fallback: `/var/lib/kiln`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("kiln")
}
