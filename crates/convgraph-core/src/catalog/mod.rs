//! Static lookup of known formats.
//!
//! The catalog is built once at startup and never mutated. Its order is
//! part of the graph's tie-break contract: when two nodes are otherwise
//! equal, the one whose format appears first here wins.

mod builtin;

use std::collections::HashMap;

use crate::types::format::{Category, Format};

pub use builtin::builtin_formats;

/// Read-only registry of format descriptors.
#[derive(Debug, Clone)]
pub struct FormatCatalog {
    /// Formats in catalog order.
    formats: Vec<Format>,
    /// Format id → index into `formats`.
    by_id: HashMap<String, usize>,
}

impl FormatCatalog {
    /// Build a catalog from descriptors. Later duplicates of an id are ignored.
    pub fn new(formats: impl IntoIterator<Item = Format>) -> Self {
        let mut list = Vec::new();
        let mut by_id = HashMap::new();
        for format in formats {
            if by_id.contains_key(&format.id) {
                continue;
            }
            by_id.insert(format.id.clone(), list.len());
            list.push(format);
        }
        Self {
            formats: list,
            by_id,
        }
    }

    /// Catalog of all built-in formats.
    pub fn builtin() -> Self {
        Self::new(builtin_formats())
    }

    /// Look up a format by canonical id.
    pub fn get(&self, id: &str) -> Option<&Format> {
        self.by_id.get(id).map(|&i| &self.formats[i])
    }

    /// Look up a format by file extension (case-insensitive).
    pub fn by_extension(&self, extension: &str) -> Option<&Format> {
        self.formats.iter().find(|f| f.matches_extension(extension))
    }

    /// Look up a format by MIME type (case-insensitive).
    pub fn by_mime(&self, mime: &str) -> Option<&Format> {
        self.formats.iter().find(|f| f.matches_mime(mime))
    }

    /// Resolve free-form user input: id, then MIME, then extension.
    pub fn resolve(&self, query: &str) -> Option<&Format> {
        let query = query.trim();
        self.get(&query.to_ascii_lowercase())
            .or_else(|| self.by_mime(query))
            .or_else(|| self.by_extension(query))
    }

    /// Detect a format from a file name's extension.
    pub fn detect(&self, file_name: &str) -> Option<&Format> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())?;
        self.by_extension(ext)
    }

    /// All formats belonging to a category, in catalog order.
    pub fn in_category(&self, category: Category) -> Vec<&Format> {
        self.formats
            .iter()
            .filter(|f| f.has_category(category))
            .collect()
    }

    /// Position of a format id in catalog order. Unknown ids sort last.
    pub fn position(&self, id: &str) -> usize {
        self.by_id.get(id).copied().unwrap_or(usize::MAX)
    }

    /// All formats in catalog order.
    pub fn formats(&self) -> &[Format] {
        &self.formats
    }

    /// Number of formats.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = FormatCatalog::builtin();
        assert_eq!(catalog.get("png").map(|f| f.mime.as_str()), Some("image/png"));
        assert_eq!(catalog.by_extension("JPG").map(|f| f.id.as_str()), Some("jpeg"));
        assert_eq!(catalog.by_mime("image/svg+xml").map(|f| f.id.as_str()), Some("svg"));
    }

    #[test]
    fn test_resolve_order() {
        let catalog = FormatCatalog::builtin();
        assert_eq!(catalog.resolve("jpeg").map(|f| f.id.as_str()), Some("jpeg"));
        assert_eq!(catalog.resolve("image/jpeg").map(|f| f.id.as_str()), Some("jpeg"));
        assert_eq!(catalog.resolve(".jpg").map(|f| f.id.as_str()), Some("jpeg"));
        assert!(catalog.resolve("nope").is_none());
    }

    #[test]
    fn test_detect_from_filename() {
        let catalog = FormatCatalog::builtin();
        assert_eq!(catalog.detect("cat.WebP").map(|f| f.id.as_str()), Some("webp"));
        assert!(catalog.detect("Makefile").is_none());
    }

    #[test]
    fn test_positions_follow_declaration() {
        let catalog = FormatCatalog::builtin();
        assert!(catalog.position("png") < catalog.position("jpeg"));
        assert_eq!(catalog.position("unknown"), usize::MAX);
    }

    #[test]
    fn test_duplicates_ignored() {
        let a = Format::new("A", "a", "a", "x/a", &[]);
        let a2 = Format::new("A2", "a", "a2", "x/a2", &[]);
        let catalog = FormatCatalog::new([a, a2]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").map(|f| f.name.as_str()), Some("A"));
    }

    #[test]
    fn test_gif_in_two_categories() {
        let catalog = FormatCatalog::builtin();
        let video: Vec<_> = catalog
            .in_category(Category::Video)
            .into_iter()
            .map(|f| f.id.as_str())
            .collect();
        assert!(video.contains(&"gif"));
        assert!(video.contains(&"mp4"));
    }
}
