//! Serializable capability export.
//!
//! The export is an ordered list rather than a map so that registration
//! order, and with it the search tie-break order, survives a round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use convgraph_core::types::capability::SupportedFormat;

/// Current export schema version.
pub const EXPORT_VERSION: u32 = 1;

/// One handler's exported capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerCapabilities {
    /// Handler name.
    pub name: String,
    /// Supported formats.
    pub formats: Vec<SupportedFormat>,
}

/// A full capability export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityExport {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// When the export was taken.
    pub generated_at: DateTime<Utc>,
    /// Handlers in registration order.
    pub handlers: Vec<HandlerCapabilities>,
}

fn default_version() -> u32 {
    EXPORT_VERSION
}
