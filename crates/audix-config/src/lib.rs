//! # audix-config
//!
//! Layered configuration loading for audix using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`AUDIX_*` prefix, `__` as separator)
//! 2. An explicit file passed to [`AudixConfig::load_from`]
//! 3. Project-level `.audix/config.toml`
//! 4. User-level `~/.config/audix/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `AUDIX_SERVER__BIND` -> `server.bind`,
//! `AUDIX_AUTH__TOKENS__ALICE` -> `auth.tokens.alice`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use audix_config::AudixConfig;
//!
//! let config = AudixConfig::load_with_dotenv().expect("config");
//! println!("listening on {}", config.server.bind);
//! ```

mod auth;
mod database;
mod error;
mod general;
mod server;
mod storage;

pub use auth::AuthConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use server::ServerConfig;
pub use storage::StorageConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "AUDIX_";
const LOCAL_CONFIG: &str = ".audix/config.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AudixConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AudixConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source is malformed or the result is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source is malformed or the result is invalid.
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load with an explicit config file layered above the default files.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `path` does not exist, or any
    /// error [`Self::load`] can return.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::InvalidValue {
                field: "config".into(),
                reason: format!("{} does not exist", path.display()),
            });
        }
        let figment = Self::base_figment()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        Self::base_figment().merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check cross-field constraints figment cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` or `ConfigError::NotConfigured`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.max_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.max_limit".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.general.default_limit > self.general.max_limit {
            return Err(ConfigError::InvalidValue {
                field: "general.default_limit".into(),
                reason: format!(
                    "{} exceeds general.max_limit ({})",
                    self.general.default_limit, self.general.max_limit
                ),
            });
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                reason: "must not be empty".into(),
            });
        }
        self.server.bind_addr()?;
        if !self.auth.is_configured() {
            return Err(ConfigError::NotConfigured {
                section: "auth".into(),
            });
        }
        Ok(())
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn base_figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(LOCAL_CONFIG);
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("audix").join("config.toml"))
    }
}
