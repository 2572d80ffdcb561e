//! Catalog id ↔ `image::ImageFormat` mapping.

use image::ImageFormat;

/// Catalog ids routed through the simple search mode.
const COMMON: &[&str] = &["png", "jpeg", "webp", "gif", "bmp"];

/// Catalog id for an `image` codec, if the catalog knows the format.
pub fn catalog_id(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpeg"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::Bmp => Some("bmp"),
        ImageFormat::Tiff => Some("tiff"),
        ImageFormat::Ico => Some("ico"),
        ImageFormat::Tga => Some("tga"),
        ImageFormat::Qoi => Some("qoi"),
        ImageFormat::Pnm => Some("pnm"),
        ImageFormat::Avif => Some("avif"),
        _ => None,
    }
}

/// `image` codec for a catalog id.
pub fn image_format(id: &str) -> Option<ImageFormat> {
    ImageFormat::all().find(|format| catalog_id(*format) == Some(id))
}

/// Whether the format is part of the common subset.
pub fn is_common(id: &str) -> bool {
    COMMON.contains(&id)
}

/// Whether encoding to `format` needs the alpha channel dropped first.
pub fn drops_alpha(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg)
}
