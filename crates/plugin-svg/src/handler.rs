//! Raster → SVG wrapping.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, ImageReader};
use tracing::debug;

use convgraph_core::catalog::FormatCatalog;
use convgraph_core::traits::handler::{ConvertOptions, Handler, HandlerError};
use convgraph_core::types::capability::SupportedFormat;
use convgraph_core::types::file::FileData;
use convgraph_core::types::format::Format;

/// Handler name as registered in the graph.
pub const HANDLER_NAME: &str = "svg-embed";

/// Produces SVG documents that embed a PNG or JPEG image as a data URI.
///
/// The image is not traced; the SVG simply displays the original pixels at
/// their native size. Needs no initialization.
#[derive(Debug)]
pub struct SvgEmbedHandler {
    catalog: Arc<FormatCatalog>,
}

impl SvgEmbedHandler {
    /// Create the handler over `catalog`.
    pub fn new(catalog: Arc<FormatCatalog>) -> Self {
        Self { catalog }
    }

    fn record(&self, id: &str, make: fn(Format) -> SupportedFormat) -> Option<SupportedFormat> {
        self.catalog.get(id).cloned().map(make)
    }
}

fn image_format(id: &str) -> Option<ImageFormat> {
    match id {
        "png" => Some(ImageFormat::Png),
        "jpeg" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

#[async_trait]
impl Handler for SvgEmbedHandler {
    fn name(&self) -> &str {
        HANDLER_NAME
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn declared_formats(&self) -> Vec<SupportedFormat> {
        [
            self.record("png", |f| SupportedFormat::input(f).common()),
            self.record("jpeg", SupportedFormat::input),
            self.record("svg", |f| SupportedFormat::output(f).common()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    async fn init(&self) -> Result<Vec<SupportedFormat>, HandlerError> {
        Ok(self.declared_formats())
    }

    async fn convert(
        &self,
        files: Vec<FileData>,
        input: &Format,
        output: &Format,
        _options: &ConvertOptions,
    ) -> Result<Vec<FileData>, HandlerError> {
        let decoder = image_format(&input.id)
            .filter(|_| output.id == "svg")
            .ok_or_else(|| HandlerError::Unsupported {
                from: input.id.clone(),
                to: output.id.clone(),
            })?;

        files
            .into_iter()
            .map(|file| -> Result<FileData, HandlerError> {
                let svg = embed(&file.bytes, decoder, &input.mime)?;
                debug!(file = %file.name, bytes = svg.len(), "Image wrapped in SVG");
                Ok(FileData::new(file.renamed(&output.extension), svg.into_bytes()))
            })
            .collect()
    }
}

fn embed(bytes: &[u8], format: ImageFormat, mime: &str) -> Result<String, HandlerError> {
    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| HandlerError::Decode(e.to_string()))?;
    let data = STANDARD.encode(bytes);
    Ok(format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" "#,
            r#"width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            r#"<image width="{w}" height="{h}" xlink:href="data:{mime};base64,{data}"/>"#,
            "</svg>\n"
        ),
        w = width,
        h = height,
        mime = mime,
        data = data,
    ))
}
