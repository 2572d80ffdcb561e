//! File format descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Broad family a format belongs to. A format may carry several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Raster or vector still images.
    Image,
    /// Moving pictures, including animated image formats.
    Video,
    /// Sound.
    Audio,
    /// Paged or rich-text documents.
    Document,
    /// Plain or lightly structured text.
    Text,
    /// Vector graphics.
    Vector,
    /// Container and archive formats.
    Archive,
    /// Structured data interchange.
    Data,
}

impl Category {
    /// Lowercase name used in configuration and CLI input.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
            Self::Text => "text",
            Self::Vector => "vector",
            Self::Archive => "archive",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "document" => Ok(Self::Document),
            "text" => Ok(Self::Text),
            "vector" => Ok(Self::Vector),
            "archive" => Ok(Self::Archive),
            "data" => Ok(Self::Data),
            other => Err(format!("Unknown format category: '{other}'")),
        }
    }
}

/// An immutable description of a file format.
///
/// Equality and hashing use only the canonical identifier: two descriptors
/// with the same `id` describe the same format even if a handler reports a
/// slightly different display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    /// Human-readable name, e.g. `"Portable Network Graphics"`.
    pub name: String,
    /// Canonical identifier, e.g. `"png"`.
    pub id: String,
    /// Canonical file extension without the leading dot.
    pub extension: String,
    /// MIME type, e.g. `"image/png"`.
    pub mime: String,
    /// Categories this format belongs to.
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Format {
    /// Create a format descriptor.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        extension: impl Into<String>,
        mime: impl Into<String>,
        categories: &[Category],
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            extension: extension.into(),
            mime: mime.into(),
            categories: categories.to_vec(),
        }
    }

    /// Whether this format belongs to the given category.
    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// Case-insensitive extension comparison; a leading dot is ignored.
    pub fn matches_extension(&self, extension: &str) -> bool {
        self.extension
            .eq_ignore_ascii_case(extension.trim_start_matches('.'))
    }

    /// Case-insensitive MIME comparison.
    pub fn matches_mime(&self, mime: &str) -> bool {
        self.mime.eq_ignore_ascii_case(mime)
    }
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Format {}

impl std::hash::Hash for Format {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.mime)
    }
}
