//! Materialized graph views for diagnostics.

use serde::{Deserialize, Serialize};

use convgraph_core::traits::handler::HandlerState;

use crate::node::NodeId;

/// A node as seen in a materialized graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Arena id.
    pub id: NodeId,
    /// Handler name.
    pub handler: String,
    /// Format id.
    pub format: String,
    /// Format MIME type.
    pub mime: String,
    /// Handler lifecycle state at materialization time.
    pub state: HandlerState,
    /// Handler accepts this format as input.
    pub from: bool,
    /// Handler can produce this format.
    pub to: bool,
    /// Part of the simple-mode route set.
    pub common: bool,
}

/// A directed edge as seen in a materialized graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInfo {
    /// Source node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Handler performing the conversion.
    pub handler: String,
    /// Edge is usable in simple mode.
    pub common: bool,
}

/// The whole graph at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    /// Capability cache generation this view was built from.
    pub generation: u64,
    /// All nodes of traversable handlers.
    pub nodes: Vec<NodeInfo>,
    /// All edges between those nodes.
    pub edges: Vec<EdgeInfo>,
}

impl GraphData {
    /// A graph with at least one node can be searched.
    pub fn is_usable(&self) -> bool {
        !self.nodes.is_empty()
    }
}
