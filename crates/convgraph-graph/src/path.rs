//! Conversion paths.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::node::{Node, NodeId};

/// An ordered, cycle-free sequence of nodes.
///
/// The step into `nodes[i + 1]` is performed by that node's handler,
/// converting `nodes[i].format` into `nodes[i + 1].format`. A single-node
/// path means no conversion is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    nodes: Vec<Node>,
}

impl Path {
    /// Build a path. Returns `None` for an empty node list.
    pub fn new(nodes: Vec<Node>) -> Option<Self> {
        if nodes.is_empty() {
            None
        } else {
            Some(Self { nodes })
        }
    }

    /// Nodes in order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of conversion steps (the cost metric).
    pub fn steps(&self) -> usize {
        self.nodes.len() - 1
    }

    /// First node.
    pub fn source(&self) -> &Node {
        &self.nodes[0]
    }

    /// Last node.
    pub fn destination(&self) -> &Node {
        &self.nodes[self.nodes.len() - 1]
    }

    /// Whether the path visits a node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id() == id)
    }

    /// Consecutive `(from, to)` pairs, one per conversion step.
    pub fn hops(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.nodes.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Format ids along the path.
    pub fn format_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.format().id.as_str()).collect()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " → ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.nodes.serialize(serializer)
    }
}
