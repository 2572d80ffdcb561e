//! Path execution configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings for running conversion paths.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExecutionConfig {
    /// Timeout in seconds for a single handler conversion call.
    #[serde(default = "default_step_timeout")]
    #[validate(range(min = 1, max = 7200))]
    pub step_timeout_seconds: u64,
    /// Timeout in seconds for a handler's lazy initialization.
    #[serde(default = "default_init_timeout")]
    #[validate(range(min = 1, max = 3600))]
    pub init_timeout_seconds: u64,
    /// Minimum size of every output payload for a step to count as successful.
    #[serde(default = "default_min_output_bytes")]
    pub min_output_bytes: usize,
}

impl ExecutionConfig {
    /// Step timeout as a [`Duration`].
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }

    /// Init timeout as a [`Duration`].
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_seconds)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: default_step_timeout(),
            init_timeout_seconds: default_init_timeout(),
            min_output_bytes: default_min_output_bytes(),
        }
    }
}

fn default_step_timeout() -> u64 {
    120
}

fn default_init_timeout() -> u64 {
    60
}

fn default_min_output_bytes() -> usize {
    1
}
