//! Core traits for convgraph.
//!
//! These traits define the contracts that external collaborators implement.

pub mod handler;

pub use handler::{ConvertOptions, Handler, HandlerError, HandlerState};
