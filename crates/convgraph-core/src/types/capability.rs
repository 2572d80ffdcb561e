//! Handler capability records.

use serde::{Deserialize, Serialize};

use super::format::Format;

/// One format a handler works with, and in which direction.
///
/// A handler that lists `A` with `from` and `B` with `to` has a direct
/// edge `A → B` in the conversion graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedFormat {
    /// The format descriptor.
    pub format: Format,
    /// The handler accepts this format as input.
    pub from: bool,
    /// The handler can produce this format.
    pub to: bool,
    /// Part of the well-tested route set searched in simple mode.
    #[serde(default)]
    pub common: bool,
}

impl SupportedFormat {
    /// Readable and writable.
    pub fn both(format: Format) -> Self {
        Self {
            format,
            from: true,
            to: true,
            common: false,
        }
    }

    /// Readable only.
    pub fn input(format: Format) -> Self {
        Self {
            format,
            from: true,
            to: false,
            common: false,
        }
    }

    /// Writable only.
    pub fn output(format: Format) -> Self {
        Self {
            format,
            from: false,
            to: true,
            common: false,
        }
    }

    /// Mark this record as part of the simple-mode route set.
    pub fn common(mut self) -> Self {
        self.common = true;
        self
    }

    /// Canonical identifier of the underlying format.
    pub fn id(&self) -> &str {
        &self.format.id
    }
}
