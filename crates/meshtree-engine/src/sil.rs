//! Subset inclusion lattice: the hierarchy graph exposed to consumers.
//!
//! Three fixed vertices anchor the graph: `SIL` (root) with children
//! `Blocks` (flat list of selectable blocks) and `Hierarchy` (blocks at their
//! nested position). Cross edges join a hierarchy vertex to its flat twin.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Child,
    Cross,
}

impl EdgeKind {
    pub fn is_cross(self) -> bool {
        matches!(self, EdgeKind::Cross)
    }
}

pub const ROOT_NAME: &str = "SIL";
pub const BLOCKS_NAME: &str = "Blocks";
pub const HIERARCHY_NAME: &str = "Hierarchy";

#[derive(Clone, Debug)]
pub struct HierarchyGraph {
    graph: DiGraph<String, EdgeKind>,
    root: NodeIndex,
    blocks: NodeIndex,
    hierarchy: NodeIndex,
    /// Vertices created since the fixed three.
    created: usize,
    max_vertices: usize,
}

impl HierarchyGraph {
    pub fn new(max_vertices: usize) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(ROOT_NAME.to_string());
        let blocks = graph.add_node(BLOCKS_NAME.to_string());
        let hierarchy = graph.add_node(HIERARCHY_NAME.to_string());
        graph.add_edge(root, blocks, EdgeKind::Child);
        graph.add_edge(root, hierarchy, EdgeKind::Child);
        Self {
            graph,
            root,
            blocks,
            hierarchy,
            created: 0,
            max_vertices,
        }
    }

    /// Drop everything but the fixed vertices.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_vertices);
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn blocks_root(&self) -> NodeIndex {
        self.blocks
    }

    pub fn hierarchy_root(&self) -> NodeIndex {
        self.hierarchy
    }

    pub fn is_capped(&self) -> bool {
        self.created >= self.max_vertices
    }

    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    /// Vertices created after initialization (the capped quantity).
    pub fn created_vertices(&self) -> usize {
        self.created
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn name(&self, vertex: NodeIndex) -> Option<&str> {
        self.graph.node_weight(vertex).map(String::as_str)
    }

    /// Structural child vertex of `parent`.
    pub fn add_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        let child = self.graph.add_node(name.to_string());
        self.created += 1;
        self.graph.add_edge(parent, child, EdgeKind::Child);
        child
    }

    /// Register a named block: a flat vertex under `Blocks`, a vertex under
    /// `parent` labelled `label`, and a cross edge joining them.
    pub fn add_named_block(
        &mut self,
        parent: NodeIndex,
        label: &str,
        unique_name: &str,
    ) -> (NodeIndex, NodeIndex) {
        let flat = self.add_child(self.blocks, unique_name);
        let nested = self.add_child(parent, label);
        self.graph.add_edge(nested, flat, EdgeKind::Cross);
        (nested, flat)
    }

    /// Structural children in creation order.
    pub fn children(&self, vertex: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .edges_directed(vertex, Direction::Outgoing)
            .filter(|e| !e.weight().is_cross())
            .map(|e| e.target())
            .collect();
        out.sort_unstable();
        out
    }

    /// Flat block vertex reached from a hierarchy vertex.
    pub fn cross_target(&self, vertex: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(vertex, Direction::Outgoing)
            .find(|e| e.weight().is_cross())
            .map(|e| e.target())
    }

    pub fn cross_edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.graph
            .edge_references()
            .filter(|e| e.weight().is_cross())
            .map(|e| (e.source(), e.target()))
    }

    /// Names of the flat block vertices, in registration order.
    pub fn block_names(&self) -> Vec<&str> {
        self.children(self.blocks)
            .into_iter()
            .filter_map(|v| self.name(v))
            .collect()
    }

    pub fn graph(&self) -> &DiGraph<String, EdgeKind> {
        &self.graph
    }

    /// Plain vertex/edge listing for serialization or display.
    pub fn snapshot(&self) -> HierarchySnapshot {
        HierarchySnapshot {
            vertices: self.graph.node_weights().cloned().collect(),
            edges: self
                .graph
                .edge_references()
                .map(|e| SnapshotEdge {
                    source: e.source().index(),
                    target: e.target().index(),
                    cross: e.weight().is_cross(),
                })
                .collect(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotEdge {
    pub source: usize,
    pub target: usize,
    pub cross: bool,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HierarchySnapshot {
    pub vertices: Vec<String>,
    pub edges: Vec<SnapshotEdge>,
}
