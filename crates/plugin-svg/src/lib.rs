//! # Plugin SVG
//!
//! A convgraph handler that turns PNG or JPEG images into SVG documents by
//! embedding the original bytes as a base64 data URI.

pub mod handler;

pub use handler::{HANDLER_NAME, SvgEmbedHandler};
