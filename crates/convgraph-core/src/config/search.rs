//! Path search configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Path search settings.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchConfig {
    /// Try simple mode (common routes only) before the full graph.
    #[serde(default = "default_true")]
    pub simple_first: bool,
    /// Maximum number of conversion steps in a candidate path.
    #[serde(default = "default_max_depth")]
    #[validate(range(min = 1, max = 64))]
    pub max_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            simple_first: default_true(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    8
}
