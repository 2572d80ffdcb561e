//! The conversion graph: adjacency computed over the live capability cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use convgraph_cache::{CapabilityCache, CapabilityEntry, CapabilitySnapshot};
use convgraph_core::catalog::FormatCatalog;
use convgraph_core::types::capability::SupportedFormat;

use crate::data::{EdgeInfo, GraphData, NodeInfo};
use crate::node::{Node, NodeArena};
use crate::search::{PathSearch, SearchMode};
use crate::selector::NodeSelector;

/// Directed graph of `(handler, format)` nodes.
///
/// Holds no capability data of its own: every query reads a fresh snapshot
/// of the [`CapabilityCache`]. Only node identities are memoized.
///
/// Ordering contract: handlers are visited in registration order, and a
/// handler's formats in catalog order, with formats unknown to the catalog
/// after known ones in the order the handler declared them.
#[derive(Debug)]
pub struct ConversionGraph {
    catalog: Arc<FormatCatalog>,
    cache: Arc<CapabilityCache>,
    arena: Mutex<NodeArena>,
    max_depth: usize,
}

impl ConversionGraph {
    /// Create a graph over a catalog and a capability cache.
    pub fn new(catalog: Arc<FormatCatalog>, cache: Arc<CapabilityCache>) -> Self {
        Self {
            catalog,
            cache,
            arena: Mutex::new(NodeArena::default()),
            max_depth: usize::MAX,
        }
    }

    /// Limit the number of steps of every path this graph's searches yield.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The format catalog.
    pub fn catalog(&self) -> &Arc<FormatCatalog> {
        &self.catalog
    }

    /// The capability cache.
    pub fn cache(&self) -> &Arc<CapabilityCache> {
        &self.cache
    }

    /// Default step limit for searches.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn arena(&self) -> MutexGuard<'_, NodeArena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A handler's records merged per format id and sorted by catalog order.
    fn records(&self, entry: &CapabilityEntry) -> Vec<SupportedFormat> {
        let mut merged: Vec<SupportedFormat> = Vec::with_capacity(entry.formats.len());
        for record in &entry.formats {
            match merged.iter_mut().find(|r| r.id() == record.id()) {
                Some(existing) => {
                    existing.from |= record.from;
                    existing.to |= record.to;
                    existing.common |= record.common;
                }
                None => merged.push(record.clone()),
            }
        }
        merged.sort_by_key(|r| self.catalog.position(r.id()));
        merged
    }

    fn intern(&self, arena: &mut NodeArena, handler: &str, record: &SupportedFormat) -> Node {
        let format = self.catalog.get(record.id()).unwrap_or(&record.format);
        arena.intern(handler, format)
    }

    /// First node satisfying `selector`, in the graph's deterministic order.
    pub fn query_node(&self, selector: &NodeSelector) -> Option<Node> {
        let snapshot = self.cache.snapshot();
        let mut arena = self.arena();
        for entry in snapshot.entries().iter().filter(|e| e.is_traversable()) {
            for record in self.records(entry) {
                let node = self.intern(&mut arena, &entry.handler, &record);
                if selector.matches(&node) {
                    return Some(node);
                }
            }
        }
        None
    }

    /// Every node of every traversable handler.
    pub fn nodes(&self) -> Vec<Node> {
        let snapshot = self.cache.snapshot();
        let mut arena = self.arena();
        let mut nodes = Vec::new();
        for entry in snapshot.entries().iter().filter(|e| e.is_traversable()) {
            for record in self.records(entry) {
                nodes.push(self.intern(&mut arena, &entry.handler, &record));
            }
        }
        nodes
    }

    /// Nodes directly reachable from `node`.
    ///
    /// For each traversable handler accepting `node`'s format, one node per
    /// other format that handler produces. The producing handler of `node`
    /// itself is irrelevant: paths may switch handlers at every hop.
    pub fn neighbors(&self, node: &Node, mode: SearchMode) -> Vec<Node> {
        let snapshot = self.cache.snapshot();
        self.neighbors_in(&snapshot, node, mode)
    }

    pub(crate) fn neighbors_in(
        &self,
        snapshot: &CapabilitySnapshot,
        node: &Node,
        mode: SearchMode,
    ) -> Vec<Node> {
        let simple = mode.is_simple();
        let source_id = node.format().id.as_str();
        let mut arena = self.arena();
        let mut neighbors = Vec::new();

        for entry in snapshot.entries().iter().filter(|e| e.is_traversable()) {
            let records = self.records(entry);
            let accepts = records
                .iter()
                .any(|r| r.from && r.id() == source_id && (!simple || r.common));
            if !accepts {
                continue;
            }
            for record in records
                .iter()
                .filter(|r| r.to && r.id() != source_id && (!simple || r.common))
            {
                neighbors.push(self.intern(&mut arena, &entry.handler, record));
            }
        }
        neighbors
    }

    /// Materialize all nodes and edges as of now.
    pub fn data(&self) -> GraphData {
        let snapshot = self.cache.snapshot();
        let mut nodes = Vec::new();
        let mut graph_nodes = Vec::new();
        {
            let mut arena = self.arena();
            for entry in snapshot.entries().iter().filter(|e| e.is_traversable()) {
                for record in self.records(entry) {
                    let node = self.intern(&mut arena, &entry.handler, &record);
                    nodes.push(NodeInfo {
                        id: node.id(),
                        handler: entry.handler.clone(),
                        format: record.id().to_string(),
                        mime: node.format().mime.clone(),
                        state: entry.state,
                        from: record.from,
                        to: record.to,
                        common: record.common,
                    });
                    graph_nodes.push(node);
                }
            }
        }

        let mut edges = Vec::new();
        for node in &graph_nodes {
            let simple = self.neighbors_in(&snapshot, node, SearchMode::Simple);
            for next in self.neighbors_in(&snapshot, node, SearchMode::Full) {
                edges.push(EdgeInfo {
                    from: node.id(),
                    to: next.id(),
                    handler: next.handler().to_string(),
                    common: simple.contains(&next),
                });
            }
        }

        GraphData {
            generation: snapshot.generation(),
            nodes,
            edges,
        }
    }

    /// Lazily search for paths from `from` to `to`.
    ///
    /// The returned iterator yields paths in increasing step order and ends
    /// when the frontier is exhausted. Dropping it cancels the search.
    pub fn search_path(
        &self,
        from: &NodeSelector,
        to: &NodeSelector,
        mode: SearchMode,
    ) -> PathSearch<'_> {
        let start = self.query_node(from);
        PathSearch::new(self, start, to.clone(), mode).max_depth(self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convgraph_core::traits::handler::HandlerState;
    use convgraph_core::types::format::Format;

    fn catalog() -> Arc<FormatCatalog> {
        Arc::new(FormatCatalog::builtin())
    }

    fn fmt(catalog: &FormatCatalog, id: &str) -> Format {
        catalog.get(id).cloned().expect("builtin format")
    }

    fn graph_with(entries: &[(&str, Vec<SupportedFormat>)]) -> ConversionGraph {
        let cache = Arc::new(CapabilityCache::new());
        for (name, formats) in entries {
            cache.register(name, formats.clone());
        }
        ConversionGraph::new(catalog(), cache)
    }

    #[test]
    fn test_query_node_is_deterministic() {
        let c = FormatCatalog::builtin();
        // Declared out of catalog order on purpose.
        let graph = graph_with(&[
            (
                "first",
                vec![
                    SupportedFormat::both(fmt(&c, "jpeg")),
                    SupportedFormat::both(fmt(&c, "png")),
                ],
            ),
            ("second", vec![SupportedFormat::both(fmt(&c, "png"))]),
        ]);

        let any_image = NodeSelector::Category(convgraph_core::types::format::Category::Image);
        let node = graph.query_node(&any_image).expect("node");
        assert_eq!(node.handler(), "first");
        assert_eq!(node.format().id, "png");
        assert_eq!(graph.query_node(&any_image), Some(node));
    }

    #[test]
    fn test_query_node_missing() {
        let graph = graph_with(&[]);
        assert!(graph.query_node(&NodeSelector::format("png")).is_none());
        assert!(!graph.data().is_usable());
    }

    #[test]
    fn test_neighbors_switch_handlers() {
        let c = FormatCatalog::builtin();
        let graph = graph_with(&[
            (
                "raster",
                vec![
                    SupportedFormat::both(fmt(&c, "png")),
                    SupportedFormat::both(fmt(&c, "webp")),
                ],
            ),
            (
                "svg",
                vec![
                    SupportedFormat::input(fmt(&c, "png")),
                    SupportedFormat::output(fmt(&c, "svg")),
                ],
            ),
        ]);

        let webp = graph
            .query_node(&NodeSelector::format("webp"))
            .expect("webp node");
        let from_webp: Vec<String> = graph
            .neighbors(&webp, SearchMode::Full)
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(from_webp, vec!["png@raster"]);

        let png = &graph.neighbors(&webp, SearchMode::Full)[0];
        let from_png: Vec<String> = graph
            .neighbors(png, SearchMode::Full)
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(from_png, vec!["webp@raster", "svg@svg"]);
    }

    #[test]
    fn test_simple_mode_uses_common_records_only() {
        let c = FormatCatalog::builtin();
        let graph = graph_with(&[(
            "raster",
            vec![
                SupportedFormat::both(fmt(&c, "png")).common(),
                SupportedFormat::both(fmt(&c, "jpeg")).common(),
                SupportedFormat::both(fmt(&c, "tga")),
            ],
        )]);

        let png = graph.query_node(&NodeSelector::format("png")).expect("png");
        let simple: Vec<String> = graph
            .neighbors(&png, SearchMode::Simple)
            .iter()
            .map(|n| n.format().id.clone())
            .collect();
        let full: Vec<String> = graph
            .neighbors(&png, SearchMode::Full)
            .iter()
            .map(|n| n.format().id.clone())
            .collect();
        assert_eq!(simple, vec!["jpeg"]);
        assert_eq!(full, vec!["jpeg", "tga"]);
    }

    #[test]
    fn test_split_records_are_merged() {
        let c = FormatCatalog::builtin();
        let graph = graph_with(&[(
            "raster",
            vec![
                SupportedFormat::input(fmt(&c, "png")),
                SupportedFormat::output(fmt(&c, "png")),
                SupportedFormat::output(fmt(&c, "bmp")),
            ],
        )]);

        let data = graph.data();
        assert_eq!(data.nodes.len(), 2);
        let png = data.nodes.iter().find(|n| n.format == "png").expect("png");
        assert!(png.from && png.to);
    }

    #[test]
    fn test_failed_handlers_are_absent() {
        let c = FormatCatalog::builtin();
        let graph = graph_with(&[
            ("broken", vec![SupportedFormat::both(fmt(&c, "png"))]),
            ("fine", vec![SupportedFormat::both(fmt(&c, "jpeg"))]),
        ]);
        graph.cache().mark_failed("broken", "boom");

        assert!(graph.query_node(&NodeSelector::format("png")).is_none());
        let data = graph.data();
        assert!(data.nodes.iter().all(|n| n.handler == "fine"));
        assert_eq!(data.nodes[0].state, HandlerState::Unregistered);
    }

    #[test]
    fn test_data_edges() {
        let c = FormatCatalog::builtin();
        let graph = graph_with(&[(
            "raster",
            vec![
                SupportedFormat::both(fmt(&c, "png")).common(),
                SupportedFormat::both(fmt(&c, "jpeg")),
            ],
        )]);

        let data = graph.data();
        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.edges.len(), 2);
        assert!(data.edges.iter().all(|e| e.handler == "raster" && !e.common));

        let json = serde_json::to_value(&data).expect("serialize");
        assert_eq!(json["nodes"].as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_uncatalogued_formats_sort_last() {
        let c = FormatCatalog::builtin();
        let exotic = Format::new("Exotic", "exotic", "exo", "application/x-exotic", &[]);
        let graph = graph_with(&[(
            "odd",
            vec![
                SupportedFormat::both(exotic),
                SupportedFormat::both(fmt(&c, "png")),
            ],
        )]);

        let ids: Vec<String> = graph.nodes().iter().map(|n| n.format().id.clone()).collect();
        assert_eq!(ids, vec!["png", "exotic"]);
    }
}
