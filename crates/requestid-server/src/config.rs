//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use requestid_tracing::TracingConfig;
use serde::Deserialize;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub request_id: RequestIdConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Request id propagation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestIdConfig {
    /// Header read from requests and echoed on responses.
    #[serde(default = "default_header_name")]
    pub header_name: String,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_header_name() -> String {
    "x-request-id".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl Default for RequestIdConfig {
    fn default() -> Self {
        Self {
            header_name: default_header_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (REQUESTID_ prefix, __ for nesting)
    /// 2. TOML config file (optional)
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("REQUESTID_").split("__"))
            .extract()?;

        Ok(config)
    }
}
