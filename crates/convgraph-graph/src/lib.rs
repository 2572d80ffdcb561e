//! # convgraph-graph
//!
//! The conversion graph and its path search.
//!
//! Nodes are `(handler, format)` pairs memoized in an arena. Edges are never
//! stored: they are computed on demand from the live capability cache, so a
//! handler that announces new formats mid-session is visible to the very
//! next query.
//!
//! [`ConversionGraph::search_path`] returns a [`PathSearch`], a lazy
//! breadth-first iterator yielding paths in order of increasing step count.

pub mod data;
pub mod graph;
pub mod node;
pub mod path;
pub mod search;
pub mod selector;

pub use data::{EdgeInfo, GraphData, NodeInfo};
pub use graph::ConversionGraph;
pub use node::{Node, NodeId};
pub use path::Path;
pub use search::{PathSearch, SearchMode};
pub use selector::NodeSelector;
