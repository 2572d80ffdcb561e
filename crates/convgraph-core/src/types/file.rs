//! In-memory file payloads passed between conversion steps.

use std::fmt;
use std::path::Path;

use bytes::Bytes;

/// A named binary payload.
#[derive(Clone, PartialEq, Eq)]
pub struct FileData {
    /// File name including extension.
    pub name: String,
    /// File contents.
    pub bytes: Bytes,
}

impl FileData {
    /// Create a new payload.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }

    /// Name this payload would carry after conversion to `extension`.
    pub fn renamed(&self, extension: &str) -> String {
        format!("{}.{}", self.stem(), extension)
    }
}

impl fmt::Debug for FileData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileData")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}
