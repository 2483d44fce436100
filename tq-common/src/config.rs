//! Configuration loading for TrackQuiz services
//!
//! Values resolve with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TOML configuration file contents (`~/.config/trackquiz/tq-mr.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Listen port for the HTTP API
    pub port: Option<u16>,
    /// Base URL of the backing download-job server
    pub job_server_url: Option<String>,
    /// Base URL of the release catalog (MusicBrainz) service
    pub catalog_url: Option<String>,
    /// API key for the generative metadata fallback
    pub fallback_api_key: Option<String>,
    /// Model name for the generative metadata fallback
    pub fallback_model: Option<String>,
    /// Base URL for the generative metadata fallback
    pub fallback_url: Option<String>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter ("trace", "debug", "info", "warn", "error")
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Get default configuration file path for the platform
///
/// Linux: `~/.config/trackquiz/<module>.toml`, then `/etc/trackquiz/<module>.toml`
pub fn default_config_path(module_name: &str) -> Result<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    if cfg!(target_os = "linux") {
        let user_config = dirs::config_dir().map(|d| d.join("trackquiz").join(&file_name));
        let system_config = PathBuf::from("/etc/trackquiz").join(&file_name);

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("trackquiz").join(&file_name))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Load TOML configuration from an explicit path, or the platform default
///
/// A missing file is not an error: returns `TomlConfig::default()` so the
/// environment/compiled tiers still apply.
pub fn load_toml_config(module_name: &str, explicit_path: Option<&str>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(p) => PathBuf::from(p),
        None => match default_config_path(module_name) {
            Ok(p) => p,
            Err(_) => return Ok(TomlConfig::default()),
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Resolve a single string value through the ENV → TOML → default tiers
pub fn resolve_value(
    env_var_name: &str,
    toml_value: Option<&String>,
    default: Option<&str>,
) -> Option<String> {
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }

    if let Some(value) = toml_value {
        if !value.trim().is_empty() {
            return Some(value.clone());
        }
    }

    default.map(|s| s.to_string())
}
