//! The raster handler.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use convgraph_core::catalog::FormatCatalog;
use convgraph_core::traits::handler::{ConvertOptions, Handler, HandlerError};
use convgraph_core::types::capability::SupportedFormat;
use convgraph_core::types::file::FileData;
use convgraph_core::types::format::Format;

use crate::mapping;

/// Handler name as registered in the graph.
pub const HANDLER_NAME: &str = "raster";

/// JPEG quality used when the `quality` option is absent.
const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Decodes and re-encodes raster images with the `image` crate.
///
/// Capabilities are not declared up front: they depend on which codecs the
/// `image` crate was built with, so they are discovered during `init`.
///
/// Options: `quality` (1–100) for JPEG output.
#[derive(Debug)]
pub struct RasterHandler {
    catalog: Arc<FormatCatalog>,
    ready: AtomicBool,
}

impl RasterHandler {
    /// Create the handler; codecs are discovered by `init`.
    pub fn new(catalog: Arc<FormatCatalog>) -> Self {
        Self {
            catalog,
            ready: AtomicBool::new(false),
        }
    }

    /// Formats the linked codecs can read or write.
    pub fn discover(&self) -> Vec<SupportedFormat> {
        let mut formats: Vec<SupportedFormat> = ImageFormat::all()
            .filter_map(|codec| {
                let id = mapping::catalog_id(codec)?;
                let format = self.catalog.get(id)?.clone();
                let (from, to) = (codec.reading_enabled(), codec.writing_enabled());
                if !from && !to {
                    return None;
                }
                Some(SupportedFormat {
                    format,
                    from,
                    to,
                    common: mapping::is_common(id),
                })
            })
            .collect();
        formats.sort_by_key(|record| self.catalog.position(record.id()));
        formats
    }
}

#[async_trait]
impl Handler for RasterHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    async fn init(&self) -> Result<Vec<SupportedFormat>, HandlerError> {
        let formats = self.discover();
        if formats.is_empty() {
            return Err(HandlerError::Init(
                "no raster codecs available in this build".to_string(),
            ));
        }
        info!(
            handler = HANDLER_NAME,
            readable = formats.iter().filter(|f| f.from).count(),
            writable = formats.iter().filter(|f| f.to).count(),
            "Raster codecs discovered"
        );
        self.ready.store(true, Ordering::Release);
        Ok(formats)
    }

    async fn convert(
        &self,
        files: Vec<FileData>,
        input: &Format,
        output: &Format,
        options: &ConvertOptions,
    ) -> Result<Vec<FileData>, HandlerError> {
        let unsupported = || HandlerError::Unsupported {
            from: input.id.clone(),
            to: output.id.clone(),
        };
        let decoder = mapping::image_format(&input.id).ok_or_else(unsupported)?;
        let encoder = mapping::image_format(&output.id).ok_or_else(unsupported)?;
        let quality = options
            .get_u64("quality")
            .map(|q| q.clamp(1, 100) as u8)
            .unwrap_or(DEFAULT_JPEG_QUALITY);

        let mut converted = Vec::with_capacity(files.len());
        for file in files {
            let name = file.renamed(&output.extension);
            debug!(file = %file.name, from = %input.id, to = %output.id, "Transcoding image");
            let bytes = tokio::task::spawn_blocking(move || {
                transcode(&file.bytes, decoder, encoder, quality)
            })
            .await
            .map_err(|e| HandlerError::Other(format!("transcode task failed: {e}")))??;
            converted.push(FileData::new(name, bytes));
        }
        Ok(converted)
    }
}

fn transcode(
    bytes: &[u8],
    decoder: ImageFormat,
    encoder: ImageFormat,
    quality: u8,
) -> Result<Vec<u8>, HandlerError> {
    let image = image::load_from_memory_with_format(bytes, decoder)
        .map_err(|e| HandlerError::Decode(e.to_string()))?;
    let image = if mapping::drops_alpha(encoder) {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };

    let mut out = Cursor::new(Vec::new());
    let encoded = match encoder {
        ImageFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        }
        _ => image.write_to(&mut out, encoder),
    };
    encoded.map_err(|e| HandlerError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    fn handler() -> RasterHandler {
        RasterHandler::new(Arc::new(FormatCatalog::builtin()))
    }

    fn format(id: &str) -> Format {
        FormatCatalog::builtin().get(id).cloned().expect("builtin format")
    }

    fn sample_png() -> Vec<u8> {
        let image = RgbaImage::from_pixel(8, 6, Rgba([200, 40, 40, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[tokio::test]
    async fn test_init_discovers_common_codecs() {
        let handler = handler();
        assert!(!handler.is_ready());

        let formats = handler.init().await.expect("init");
        assert!(handler.is_ready());

        let png = formats.iter().find(|f| f.id() == "png").expect("png");
        assert!(png.from && png.to && png.common);
        let jpeg = formats.iter().find(|f| f.id() == "jpeg").expect("jpeg");
        assert!(jpeg.from && jpeg.to);
    }

    #[tokio::test]
    async fn test_png_to_jpeg() {
        let files = vec![FileData::new("sample.png", sample_png())];
        let out = handler()
            .convert(files, &format("png"), &format("jpeg"), &ConvertOptions::new())
            .await
            .expect("convert");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "sample.jpg");
        assert_eq!(&out[0].bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory_with_format(&out[0].bytes, ImageFormat::Jpeg)
            .expect("valid jpeg");
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[tokio::test]
    async fn test_quality_option_changes_output() {
        let h = handler();
        let convert = |quality: u64| {
            let files = vec![FileData::new("q.png", sample_png())];
            let options = ConvertOptions::new().with("quality", quality);
            let h = &h;
            async move {
                h.convert(files, &format("png"), &format("jpeg"), &options)
                    .await
                    .expect("convert")
            }
        };
        let low = convert(5).await;
        let high = convert(100).await;
        assert_ne!(low[0].bytes, high[0].bytes);
    }

    #[tokio::test]
    async fn test_garbage_input_is_decode_error() {
        let files = vec![FileData::new("broken.png", b"not an image".to_vec())];
        let err = handler()
            .convert(files, &format("png"), &format("bmp"), &ConvertOptions::new())
            .await
            .expect_err("decode error");
        assert!(matches!(err, HandlerError::Decode(_)));
    }

    #[tokio::test]
    async fn test_non_raster_target_is_unsupported() {
        let files = vec![FileData::new("a.png", sample_png())];
        let err = handler()
            .convert(files, &format("png"), &format("svg"), &ConvertOptions::new())
            .await
            .expect_err("unsupported");
        assert!(matches!(err, HandlerError::Unsupported { .. }));
    }
}
