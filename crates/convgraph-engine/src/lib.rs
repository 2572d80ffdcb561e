//! # convgraph-engine
//!
//! Turns paths into conversions.
//!
//! - [`HandlerRegistry`] owns handler instances and initializes each one
//!   lazily, exactly once, with a timeout. Failures are recorded in the
//!   capability cache so the graph stops routing through the handler.
//! - [`PathExecutor`] runs the steps of one path, bounding each by the step
//!   timeout and rejecting empty output.
//! - [`Traverser`] searches, executes, and on failure excludes the failing
//!   node and searches again until a path succeeds or none remain.
//! - [`ConversionContext`] wires all of the above to one configuration.

pub mod context;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod registry;
pub mod traversal;

pub use context::ConversionContext;
pub use error::ConversionError;
pub use executor::{PathExecutor, StepFailure};
pub use metrics::{ConversionMetrics, MetricsSnapshot};
pub use registry::{HandlerInfo, HandlerRegistry};
pub use traversal::{ConversionOutcome, Traverser};
