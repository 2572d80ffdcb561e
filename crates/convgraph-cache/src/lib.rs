//! # convgraph-cache
//!
//! The handler capability cache: which formats each handler currently
//! supports, and where each handler is in its lifecycle.
//!
//! - Entries are replaced whole, so readers never see a half-written entry.
//! - Snapshots are taken under one read lock and are internally consistent.
//! - The cache can be exported to JSON and re-imported at startup so that
//!   handlers need not be initialized just to learn their capabilities.

pub mod entry;
pub mod export;
pub mod store;

pub use entry::CapabilityEntry;
pub use export::{CapabilityExport, HandlerCapabilities};
pub use store::{CapabilityCache, CapabilitySnapshot};
