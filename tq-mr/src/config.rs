//! Configuration resolution for tq-mr
//!
//! Values resolve CLI → ENV → TOML → compiled default. The generative
//! fallback stays disabled unless a credential is found; the service
//! still runs, resolving from the catalog only.

use tq_common::config::{resolve_value, TomlConfig};

const DEFAULT_PORT: u16 = 5731;
const DEFAULT_JOB_SERVER_URL: &str = "http://127.0.0.1:8790";
const DEFAULT_CATALOG_URL: &str = "https://musicbrainz.org/ws/2";

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HTTP API listen port
    pub port: u16,
    /// Base URL of the backing download-job server
    pub job_server_url: String,
    /// Base URL of the release catalog
    pub catalog_url: String,
    /// Generative fallback settings; None disables the fallback path
    pub fallback: Option<FallbackConfig>,
}

/// Generative fallback settings
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl ServiceConfig {
    /// Resolve the full configuration from CLI overrides and a parsed
    /// TOML config
    pub fn resolve(
        cli_port: Option<u16>,
        cli_job_server_url: Option<&str>,
        toml_config: &TomlConfig,
    ) -> Self {
        let port = cli_port
            .or_else(|| {
                std::env::var("TQ_MR_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
            })
            .or(toml_config.port)
            .unwrap_or(DEFAULT_PORT);

        let job_server_url = cli_job_server_url
            .map(|s| s.to_string())
            .or_else(|| {
                resolve_value(
                    "TQ_JOB_SERVER_URL",
                    toml_config.job_server_url.as_ref(),
                    Some(DEFAULT_JOB_SERVER_URL),
                )
            })
            .unwrap_or_else(|| DEFAULT_JOB_SERVER_URL.to_string());

        let catalog_url = resolve_value(
            "TQ_CATALOG_URL",
            toml_config.catalog_url.as_ref(),
            Some(DEFAULT_CATALOG_URL),
        )
        .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());

        let fallback = resolve_fallback(toml_config);

        Self {
            port,
            job_server_url,
            catalog_url,
            fallback,
        }
    }
}

/// Resolve the fallback credential from ENV → TOML
///
/// Returns None when no key is configured; the resolver then skips the
/// fallback step and tracks without a catalog match end up NotFound.
fn resolve_fallback(toml_config: &TomlConfig) -> Option<FallbackConfig> {
    let env_key = std::env::var("TQ_FALLBACK_API_KEY")
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .fallback_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        tracing::warn!(
            "Fallback API key found in environment and TOML; using environment (highest priority)"
        );
    }

    let api_key = match env_key.or(toml_key) {
        Some(key) => {
            tracing::info!("Generative metadata fallback enabled");
            key
        }
        None => {
            tracing::warn!(
                "Fallback API key not configured; tracks without a catalog match will be dropped. \
                 Configure via TQ_FALLBACK_API_KEY or fallback_api_key in \
                 ~/.config/trackquiz/tq-mr.toml"
            );
            return None;
        }
    };

    Some(FallbackConfig {
        api_key,
        base_url: resolve_value("TQ_FALLBACK_URL", toml_config.fallback_url.as_ref(), None),
        model: resolve_value("TQ_FALLBACK_MODEL", toml_config.fallback_model.as_ref(), None),
    })
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
