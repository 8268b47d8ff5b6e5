//! Subgraph closure over the colony graph.
//!
//! This module provides the multi-source BFS behind the subgraph
//! selection tool. It answers: "Which polyps descend from (or are
//! ancestors of, or share a fragment with) the ones I tapped?"
//!
//! Results are recomputed on every call; nothing is cached between taps.

use crate::error::GraphError;
use crate::graph::GraphIndex;
use crate::{EdgeId, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;

/// Which edges a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Follow parent → child edges.
    #[default]
    Descendants,
    /// Follow child → parent edges.
    Ancestors,
    /// Ignore edge direction: the weakly connected component.
    Component,
}

impl TraversalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraversalMode::Descendants => "descendants",
            TraversalMode::Ancestors => "ancestors",
            TraversalMode::Component => "component",
        }
    }
}

impl std::fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TraversalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "descendants" | "descendant" | "down" => Ok(TraversalMode::Descendants),
            "ancestors" | "ancestor" | "up" => Ok(TraversalMode::Ancestors),
            "component" | "fragment" => Ok(TraversalMode::Component),
            other => Err(format!(
                "unknown traversal mode '{}' (expected descendants, ancestors or component)",
                other
            )),
        }
    }
}

impl GraphIndex {
    /// Computes the closure of `roots` under `mode`.
    ///
    /// The result contains the roots themselves, has no duplicates and
    /// is sorted ascending. Cycles are fine: a vertex is enqueued at most
    /// once. Empty `roots` give an empty result.
    pub fn closure(
        &self,
        roots: &[VertexId],
        mode: TraversalMode,
    ) -> Result<Vec<VertexId>, GraphError> {
        Ok(self
            .closure_with_depth(roots, mode)?
            .into_iter()
            .map(|(vertex, _)| vertex)
            .collect())
    }

    /// Like [`closure`](Self::closure), but pairs every vertex with its
    /// hop distance from the nearest root.
    pub fn closure_with_depth(
        &self,
        roots: &[VertexId],
        mode: TraversalMode,
    ) -> Result<Vec<(VertexId, usize)>, GraphError> {
        let vertex_count = self.vertex_count();
        if let Some(&vertex) = roots.iter().find(|&&r| r >= vertex_count) {
            return Err(GraphError::OutOfRange {
                vertex,
                vertex_count,
            });
        }

        let mut depth: Vec<Option<usize>> = vec![None; vertex_count];
        let mut queue: VecDeque<VertexId> = VecDeque::new();

        // All roots start at depth 0, so this is one BFS from many sources.
        for &root in roots {
            if depth[root].is_none() {
                depth[root] = Some(0);
                queue.push_back(root);
            }
        }

        while let Some(current) = queue.pop_front() {
            let next_depth = depth[current].unwrap_or(0) + 1;
            for &neighbor in self.neighbors(current, mode) {
                if depth[neighbor].is_none() {
                    depth[neighbor] = Some(next_depth);
                    queue.push_back(neighbor);
                }
            }
            if mode == TraversalMode::Component {
                for &neighbor in self.parents(current) {
                    if depth[neighbor].is_none() {
                        depth[neighbor] = Some(next_depth);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        Ok(depth
            .into_iter()
            .enumerate()
            .filter_map(|(vertex, d)| d.map(|d| (vertex, d)))
            .collect())
    }

    /// Returns the ids of all edges with both endpoints in `vertices`.
    pub fn induced_edges(&self, vertices: &[VertexId]) -> Vec<EdgeId> {
        let mut member = vec![false; self.vertex_count()];
        for &v in vertices {
            if let Some(slot) = member.get_mut(v) {
                *slot = true;
            }
        }

        self.edges()
            .filter(|e| member[e.source] && member[e.target])
            .map(|e| e.id)
            .collect()
    }

    fn neighbors(&self, vertex: VertexId, mode: TraversalMode) -> &[VertexId] {
        match mode {
            TraversalMode::Descendants | TraversalMode::Component => self.children(vertex),
            TraversalMode::Ancestors => self.parents(vertex),
        }
    }
}
