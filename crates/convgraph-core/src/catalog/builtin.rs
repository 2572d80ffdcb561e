//! Formats known at startup.

use crate::types::format::{Category, Format};

macro_rules! define_formats {
    ($($id:literal => ($name:literal, $ext:literal, $mime:literal, [$($cat:ident),*])),* $(,)?) => {
        /// All built-in format descriptors in catalog order.
        pub fn builtin_formats() -> Vec<Format> {
            vec![$(Format::new($name, $id, $ext, $mime, &[$(Category::$cat),*]),)*]
        }
    };
}

define_formats! {
    "png"  => ("Portable Network Graphics", "png", "image/png", [Image]),
    "jpeg" => ("JPEG Image", "jpg", "image/jpeg", [Image]),
    "webp" => ("WebP Image", "webp", "image/webp", [Image]),
    "gif"  => ("Graphics Interchange Format", "gif", "image/gif", [Image, Video]),
    "bmp"  => ("Windows Bitmap", "bmp", "image/bmp", [Image]),
    "tiff" => ("Tagged Image File Format", "tiff", "image/tiff", [Image]),
    "ico"  => ("Windows Icon", "ico", "image/x-icon", [Image]),
    "tga"  => ("Truevision TGA", "tga", "image/x-tga", [Image]),
    "qoi"  => ("Quite OK Image", "qoi", "image/x-qoi", [Image]),
    "pnm"  => ("Portable Any Map", "pnm", "image/x-portable-anymap", [Image]),
    "avif" => ("AV1 Image File Format", "avif", "image/avif", [Image]),
    "svg"  => ("Scalable Vector Graphics", "svg", "image/svg+xml", [Image, Vector]),
    "pdf"  => ("Portable Document Format", "pdf", "application/pdf", [Document]),
    "html" => ("HyperText Markup Language", "html", "text/html", [Document, Text]),
    "md"   => ("Markdown", "md", "text/markdown", [Document, Text]),
    "txt"  => ("Plain Text", "txt", "text/plain", [Text]),
    "json" => ("JSON", "json", "application/json", [Data, Text]),
    "mp4"  => ("MPEG-4 Video", "mp4", "video/mp4", [Video]),
    "webm" => ("WebM Video", "webm", "video/webm", [Video]),
    "mp3"  => ("MP3 Audio", "mp3", "audio/mpeg", [Audio]),
    "wav"  => ("Waveform Audio", "wav", "audio/wav", [Audio]),
    "ogg"  => ("Ogg Vorbis", "ogg", "audio/ogg", [Audio]),
    "zip"  => ("ZIP Archive", "zip", "application/zip", [Archive]),
}
