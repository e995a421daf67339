//! # Configuration
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults
//! 2. `vee.toml` in the working directory (or an explicit file)
//! 3. `VEE__*` environment variables, `__` separating sections,
//!    e.g. `VEE__STORE__URL=http://127.0.0.1:8090`
//!
//! A `.env` file, if present, is loaded into the environment first.

use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub use vee_ui::Routes;

pub const ENV_PREFIX: &str = "VEE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, empty unless seeded
    #[default]
    Memory,
    PocketBase,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    /// Username or email to sign in with
    pub identity: Option<String>,
    pub password: Option<SecretString>,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "http://127.0.0.1:8090".to_string(),
            identity: None,
            password: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: u32,
    pub search_limit: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { page_size: 50, search_limit: 15 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` overrides it
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub feed: FeedConfig,
    pub routes: Routes,
    pub log: LogConfig,
}

impl AppConfig {
    /// Loads `.env`, then `path` (required) or `vee.toml` (optional), then
    /// the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "ignoring unreadable .env file");
            }
        }

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("vee").required(false),
        };
        Self::assemble(Config::builder().add_source(file).add_source(environment()))
    }

    fn assemble(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::PocketBase && self.store.url.trim().is_empty() {
            return Err(ConfigError::Invalid("store.url is required for the pocketbase backend".into()));
        }
        if self.store.identity.is_some() != self.store.password.is_some() {
            return Err(ConfigError::Invalid("store.identity and store.password must be set together".into()));
        }
        if self.feed.page_size == 0 || self.feed.search_limit == 0 {
            return Err(ConfigError::Invalid("feed limits must be positive".into()));
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
