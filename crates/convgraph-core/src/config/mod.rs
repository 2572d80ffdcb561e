//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod cache;
pub mod execution;
pub mod logging;
pub mod search;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::cache::CacheConfig;
use self::execution::ExecutionConfig;
use self::logging::LoggingConfig;
use self::search::SearchConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Path search settings.
    #[serde(default)]
    #[validate(nested)]
    pub search: SearchConfig,
    /// Path execution settings.
    #[serde(default)]
    #[validate(nested)]
    pub execution: ExecutionConfig,
    /// Capability cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `path` with an environment-specific overlay `config/{env}` and
    /// environment variables prefixed with `CONVGRAPH__`. Missing files are
    /// skipped; every field has a default.
    pub fn load(path: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CONVGRAPH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }
}
