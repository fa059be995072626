//! # configs
//!
//! Layered settings shared by the `pollstream` server and the `pollctl`
//! client. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `pollstream.toml` (or the file passed to [`load_from`]), optional
//! 3. `POLLSTREAM__<SECTION>__<KEY>` environment variables, e.g.
//!    `POLLSTREAM__SERVER__PORT=8080`
//!
//! A `.env` file in the working directory is loaded into the environment
//! first.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "pollstream.toml";
pub const ENV_PREFIX: &str = "POLLSTREAM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub log: LogSettings,
    pub client: ClientSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Mount point of the poll routes
    pub base_path: String,
    pub cors_allow_any_origin: bool,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err| ConfigError::Invalid(format!("server address: {err}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    JsonFile,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// JSON document path for the `json-file` backend
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSettings {
    /// Store URL including the base path
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub refresh_interval_ms: u64,
    /// Origin used when printing share links
    pub share_origin: String,
}

/// Loads `.env`, then [`DEFAULT_CONFIG_FILE`] and the environment.
pub fn load() -> Result<Settings, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }
    load_from(Path::new(DEFAULT_CONFIG_FILE))
}

/// Same as [`load`] with an explicit settings file and without `.env`.
pub fn load_from(file: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000)?
        .set_default("server.base_path", "/api")?
        .set_default("server.cors_allow_any_origin", true)?
        .set_default("storage.backend", "json-file")?
        .set_default("storage.path", "data/polls.json")?
        .set_default("log.filter", "info")?
        .set_default("log.format", "json")?
        .set_default("client.base_url", "http://localhost:3000/api")?
        .set_default("client.cache_dir", ".pollstream")?
        .set_default("client.refresh_interval_ms", 1500)?
        .set_default("client.share_origin", "http://localhost:3000")?
        .add_source(File::from(file).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.base_path.is_empty() && !self.server.base_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "server.base_path must start with '/': {}",
                self.server.base_path
            )));
        }
        if self.client.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "client.refresh_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
