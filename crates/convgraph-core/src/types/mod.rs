//! Shared domain types.

pub mod capability;
pub mod file;
pub mod format;

pub use capability::SupportedFormat;
pub use file::FileData;
pub use format::{Category, Format};
