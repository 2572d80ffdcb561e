//! Lazy breadth-first path search.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::graph::ConversionGraph;
use crate::node::{Node, NodeId};
use crate::path::Path;
use crate::selector::NodeSelector;

/// Which edges a search may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Only capability records flagged `common`.
    #[default]
    Simple,
    /// Every capability record.
    Full,
}

impl SearchMode {
    /// Map the boolean `simple` flag onto a mode.
    pub fn from_simple(simple: bool) -> Self {
        if simple { Self::Simple } else { Self::Full }
    }

    /// Whether this mode restricts the graph to common records.
    pub fn is_simple(self) -> bool {
        matches!(self, Self::Simple)
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Full => write!(f, "full"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

/// Breadth-first iterator over conversion paths.
///
/// Each pull advances the frontier only as far as needed to find the next
/// path, so consumers may stop after the first usable result. Paths come out
/// in non-decreasing step order and never repeat a format. Every node is
/// dequeued at most once per search, which bounds the work on cyclic graphs
/// and guarantees the iterator ends.
///
/// Adjacency is read from the live cache on every expansion.
pub struct PathSearch<'g> {
    graph: &'g ConversionGraph,
    target: NodeSelector,
    mode: SearchMode,
    queue: VecDeque<Vec<Node>>,
    visited: HashSet<NodeId>,
    excluded: HashSet<NodeId>,
    max_depth: usize,
}

impl<'g> PathSearch<'g> {
    pub(crate) fn new(
        graph: &'g ConversionGraph,
        start: Option<Node>,
        target: NodeSelector,
        mode: SearchMode,
    ) -> Self {
        let mut queue = VecDeque::new();
        if let Some(start) = start {
            queue.push_back(vec![start]);
        }
        Self {
            graph,
            target,
            mode,
            queue,
            visited: HashSet::new(),
            excluded: HashSet::new(),
            max_depth: usize::MAX,
        }
    }

    /// Never enter these nodes. An excluded start node yields nothing.
    pub fn excluding(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.excluded.extend(nodes);
        self
    }

    /// Stop expanding trails at this many steps.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Edge mode of this search.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    fn expand(&mut self, trail: &[Node]) {
        let Some(current) = trail.last() else {
            return;
        };
        if trail.len() - 1 >= self.max_depth {
            return;
        }
        for next in self.graph.neighbors(current, self.mode) {
            if self.excluded.contains(&next.id()) || self.visited.contains(&next.id()) {
                continue;
            }
            if trail.iter().any(|n| n.format().id == next.format().id) {
                continue;
            }
            trace!(from = %current, to = %next, "Frontier extended");
            let mut extended = Vec::with_capacity(trail.len() + 1);
            extended.extend_from_slice(trail);
            extended.push(next);
            self.queue.push_back(extended);
        }
    }
}

impl Iterator for PathSearch<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Path> {
        while let Some(trail) = self.queue.pop_front() {
            let Some(current) = trail.last() else {
                continue;
            };
            let id = current.id();
            if self.excluded.contains(&id) || !self.visited.insert(id) {
                continue;
            }

            let is_match = self.target.matches(current);
            // A matching start node still needs expanding: the caller may
            // reject the trivial path.
            if !is_match || trail.len() == 1 {
                self.expand(&trail);
            }
            if is_match {
                debug!(steps = trail.len() - 1, destination = %current, "Path found");
                return Path::new(trail);
            }
        }
        None
    }
}

impl fmt::Debug for PathSearch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathSearch")
            .field("target", &self.target)
            .field("mode", &self.mode)
            .field("frontier", &self.queue.len())
            .field("visited", &self.visited.len())
            .field("excluded", &self.excluded.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
