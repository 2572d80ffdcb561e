//! Graph nodes and the arena that memoizes them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use convgraph_core::types::format::Format;

/// Stable index of a node within one graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A `(handler, format)` pair.
///
/// Identity is the arena id, which is unique per (handler name, format id).
/// Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    handler: Arc<str>,
    format: Arc<Format>,
}

impl Node {
    /// Arena id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the handler that produces (or reads) this format.
    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// The format at this node.
    pub fn format(&self) -> &Format {
        &self.format
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.format.id, self.handler)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Node", 4)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("handler", &*self.handler)?;
        s.serialize_field("format", &self.format.id)?;
        s.serialize_field("mime", &self.format.mime)?;
        s.end()
    }
}

/// Append-only node storage keyed by (handler, format id).
#[derive(Debug, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
    index: HashMap<(String, String), NodeId>,
    formats: HashMap<String, Arc<Format>>,
}

impl NodeArena {
    /// Return the node for `(handler, format)`, creating it on first use.
    ///
    /// The first descriptor seen for a format id is the one kept.
    pub(crate) fn intern(&mut self, handler: &str, format: &Format) -> Node {
        let key = (handler.to_string(), format.id.clone());
        if let Some(id) = self.index.get(&key) {
            return self.nodes[id.0 as usize].clone();
        }

        let handler: Arc<str> = Arc::from(handler);
        let format = Arc::clone(
            self.formats
                .entry(format.id.clone())
                .or_insert_with(|| Arc::new(format.clone())),
        );

        let id = NodeId(self.nodes.len() as u32);
        let node = Node {
            id,
            handler,
            format,
        };
        self.index.insert(key, id);
        self.nodes.push(node.clone());
        node
    }

    /// Number of nodes ever created.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
