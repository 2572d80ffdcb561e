//! # Plugin Raster
//!
//! A convgraph handler that converts between raster image formats using the
//! `image` crate: PNG, JPEG, WebP, GIF, BMP, TIFF, ICO, TGA, QOI, PNM and
//! (write-only) AVIF, depending on the codecs compiled in.

pub mod handler;
pub mod mapping;

pub use handler::{HANDLER_NAME, RasterHandler};
