//! A single handler's cache entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use convgraph_core::traits::handler::HandlerState;
use convgraph_core::types::capability::SupportedFormat;

/// Everything the cache knows about one handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityEntry {
    /// Handler name.
    pub handler: String,
    /// Registration ordinal. Fixed on first registration; drives tie-breaks.
    pub ordinal: usize,
    /// Currently known supported formats.
    pub formats: Vec<SupportedFormat>,
    /// Lifecycle state.
    pub state: HandlerState,
    /// Reason for the most recent failure, if any.
    pub failure: Option<String>,
    /// When this entry was last replaced.
    pub updated_at: DateTime<Utc>,
}

impl CapabilityEntry {
    pub(crate) fn new(handler: &str, ordinal: usize) -> Self {
        Self {
            handler: handler.to_string(),
            ordinal,
            formats: Vec::new(),
            state: HandlerState::Unregistered,
            failure: None,
            updated_at: Utc::now(),
        }
    }

    /// Whether edges through this handler may be searched.
    pub fn is_traversable(&self) -> bool {
        self.state.is_traversable()
    }

    /// Records this handler accepts as input.
    pub fn inputs(&self) -> impl Iterator<Item = &SupportedFormat> {
        self.formats.iter().filter(|f| f.from)
    }

    /// Records this handler can produce.
    pub fn outputs(&self) -> impl Iterator<Item = &SupportedFormat> {
        self.formats.iter().filter(|f| f.to)
    }

    /// Find the input-side record for a format id.
    pub fn input(&self, format_id: &str) -> Option<&SupportedFormat> {
        self.inputs().find(|f| f.id() == format_id)
    }
}
