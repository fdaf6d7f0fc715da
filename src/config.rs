use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Env file read when no `--config-path` is given.
pub const DEFAULT_ENV_FILE: &str = "/etc/lotus_exporter/.env";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub lotus: LotusConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LotusConfig {
    /// `TOKEN:MULTIADDR` of the full-node daemon
    pub fullnode_api_info: SecretString,
    /// `TOKEN:MULTIADDR` of the storage-provider process
    pub miner_api_info: SecretString,
    /// Displayed owner actor id, replacing the chain-derived one
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Displayed owner key address, replacing the chain-derived one
    #[serde(default)]
    pub owner_addr: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            metrics_path: default_metrics_path(),
        }
    }
}

fn default_listen_address() -> String {
    ":9141".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_verify_tls() -> bool {
    true
}

impl ServerConfig {
    /// Socket address to bind; a bare `:PORT` binds every interface.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

impl Config {
    /// Load configuration from an env file plus the process environment.
    ///
    /// `env_file` is the operator-supplied path; when it is `None` the default
    /// location is tried and a missing file only produces a warning.
    pub fn load(env_file: Option<&str>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .with_context(|| format!("Failed to load env file {}", path))?;
                info!("Loaded env file {}", path);
            }
            None if Path::new(DEFAULT_ENV_FILE).exists() => {
                dotenvy::from_path(DEFAULT_ENV_FILE)
                    .with_context(|| format!("Failed to load env file {}", DEFAULT_ENV_FILE))?;
                info!("Loaded env file {}", DEFAULT_ENV_FILE);
            }
            None => {
                warn!(
                    "No env file at {}, assuming environment variables are set",
                    DEFAULT_ENV_FILE
                );
                dotenvy::dotenv().ok();
            }
        }

        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("LOTUS_EXPORTER").separator("__"))
            .set_override_option("lotus.fullnode_api_info", env_value("FULLNODE_API_INFO"))?
            .set_override_option("lotus.miner_api_info", env_value("MINER_API_INFO"))?
            .set_override_option("lotus.owner_id", env_value("OWNER_ID"))?
            .set_override_option("lotus.owner_addr", env_value("OWNER_ADDR"))?
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

// Empty variables count as unset so `OWNER_ID=` in an env file disables the override.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
