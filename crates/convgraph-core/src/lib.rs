//! # convgraph-core
//!
//! Core crate for convgraph. Contains the format model and catalog, file
//! payloads, handler capability records, the handler contract, configuration
//! schemas, and the unified error system.
//!
//! This crate has **no** internal dependencies on other convgraph crates.

pub mod catalog;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use catalog::FormatCatalog;
pub use error::AppError;
pub use result::AppResult;
pub use traits::handler::{ConvertOptions, Handler, HandlerError, HandlerState};
pub use types::capability::SupportedFormat;
pub use types::file::FileData;
pub use types::format::{Category, Format};
