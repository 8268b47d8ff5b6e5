//! Core graph index.
//!
//! The GraphIndex is rebuilt from scratch whenever the edge table is
//! reloaded and never mutated afterwards. It is what traversals read.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::{EdgeId, VertexId};
use petgraph::algo::{connected_components, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

/// Adjacency index of the colony graph.
///
/// Vertex ids are dense, `0..vertex_count`. For every vertex the index
/// stores its direct children and direct parents in the order the edges
/// appear in the edge table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphIndex {
    /// Outgoing adjacency: parent → children.
    children: Vec<Vec<VertexId>>,

    /// Incoming adjacency: child → parents.
    parents: Vec<Vec<VertexId>>,

    /// All edges, indexed by edge id.
    edges: Vec<Edge>,
}

impl GraphIndex {
    /// Creates an index without vertices or edges.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the index from ordered `(source, target)` pairs.
    ///
    /// The position of a pair is its edge id. Fails on the first pair
    /// referencing a vertex outside `0..vertex_count`; dropping such an
    /// edge silently would change what is reachable.
    pub fn build(vertex_count: usize, pairs: &[(VertexId, VertexId)]) -> Result<Self, GraphError> {
        let mut children = vec![Vec::new(); vertex_count];
        let mut parents = vec![Vec::new(); vertex_count];
        let mut edges = Vec::with_capacity(pairs.len());

        for (id, &(source, target)) in pairs.iter().enumerate() {
            for vertex in [source, target] {
                if vertex >= vertex_count {
                    return Err(GraphError::DanglingEdge {
                        edge: id,
                        vertex,
                        vertex_count,
                    });
                }
            }

            children[source].push(target);
            parents[target].push(source);
            edges.push(Edge::new(id, source, target));
        }

        Ok(Self {
            children,
            parents,
            edges,
        })
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.children.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True if `vertex` is a vertex of this graph.
    pub fn contains(&self, vertex: VertexId) -> bool {
        vertex < self.vertex_count()
    }

    /// Direct descendants of `vertex`, in edge-table order.
    pub fn children(&self, vertex: VertexId) -> &[VertexId] {
        self.children.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct ancestors of `vertex`, in edge-table order.
    pub fn parents(&self, vertex: VertexId) -> &[VertexId] {
        self.parents.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates over all edges in edge-table order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Converts the index into a petgraph graph with vertex ids as node
    /// weights and edge ids as edge weights.
    pub fn to_petgraph(&self) -> DiGraph<VertexId, EdgeId> {
        let mut graph = DiGraph::with_capacity(self.vertex_count(), self.edge_count());
        for vertex in 0..self.vertex_count() {
            graph.add_node(vertex);
        }
        for edge in &self.edges {
            graph.add_edge(
                NodeIndex::new(edge.source),
                NodeIndex::new(edge.target),
                edge.id,
            );
        }
        graph
    }

    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let graph = self.to_petgraph();

        GraphStats {
            vertex_count: self.vertex_count(),
            edge_count: self.edge_count(),
            components: connected_components(&graph),
            is_cyclic: is_cyclic_directed(&graph),
            self_loops: self.edges.iter().filter(|e| e.is_loop()).count(),
            roots: self.parents.iter().filter(|p| p.is_empty()).count(),
            leaves: self.children.iter().filter(|c| c.is_empty()).count(),
        }
    }
}

/// Graph statistics for the status command and session info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub vertex_count: usize,
    pub edge_count: usize,
    /// Weakly connected components, i.e. colony fragments.
    pub components: usize,
    pub is_cyclic: bool,
    pub self_loops: usize,
    /// Vertices without parents.
    pub roots: usize,
    /// Vertices without children.
    pub leaves: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_preserves_edge_order() {
        let index = GraphIndex::build(4, &[(0, 3), (0, 1), (2, 1), (0, 2)]).unwrap();

        assert_eq!(index.children(0), &[3, 1, 2]);
        assert_eq!(index.parents(1), &[0, 2]);
        assert_eq!(index.children(3), &[] as &[VertexId]);
        assert_eq!(index.edges().nth(2), Some(&Edge::new(2, 2, 1)));
        assert_eq!(index.vertex_count(), 4);
        assert_eq!(index.edge_count(), 4);
    }

    #[test]
    fn test_dangling_target() {
        let err = GraphIndex::build(5, &[(0, 1), (1, 99)]).unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingEdge {
                edge: 1,
                vertex: 99,
                vertex_count: 5
            }
        );
        assert!(err.is_data_integrity());
    }

    #[test]
    fn test_dangling_source() {
        let err = GraphIndex::build(2, &[(7, 1)]).unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { vertex: 7, .. }));
    }

    #[test]
    fn test_isolated_vertices() {
        let index = GraphIndex::build(3, &[]).unwrap();
        assert_eq!(index.vertex_count(), 3);
        assert!(index.contains(2));
        assert!(!index.contains(3));
        assert_eq!(index.children(5), &[] as &[VertexId]);
    }

    #[test]
    fn test_stats() {
        // Two fragments: 0 → 1 → 2 and 3 → 4 → 3 (cycle), 5 alone.
        let index = GraphIndex::build(6, &[(0, 1), (1, 2), (3, 4), (4, 3)]).unwrap();
        let stats = index.stats();

        assert_eq!(stats.vertex_count, 6);
        assert_eq!(stats.edge_count, 4);
        assert_eq!(stats.components, 3);
        assert!(stats.is_cyclic);
        assert_eq!(stats.self_loops, 0);
        assert_eq!(stats.roots, 2); // 0 and 5
        assert_eq!(stats.leaves, 2); // 2 and 5
    }

    #[test]
    fn test_petgraph_conversion() {
        let index = GraphIndex::build(3, &[(0, 1), (1, 2)]).unwrap();
        let graph = index.to_petgraph();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(!is_cyclic_directed(&graph));
    }
}
