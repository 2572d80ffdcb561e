//! Capability cache configuration.

use serde::{Deserialize, Serialize};

/// Capability cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// JSON export used to pre-populate handler capabilities at startup.
    #[serde(default)]
    pub path: Option<String>,
    /// Rewrite `path` after handlers finish initializing.
    #[serde(default)]
    pub write_back: bool,
}
