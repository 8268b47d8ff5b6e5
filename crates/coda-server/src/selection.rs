//! The shared selection.
//!
//! Every view reads the same two id sets. Replacing a set is the only way
//! to change it; there is no incremental add or remove.

use coda_core::{EdgeId, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which id set a selection operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    Vertex,
    Edge,
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionKind::Vertex => write!(f, "vertex"),
            SelectionKind::Edge => write!(f, "edge"),
        }
    }
}

/// Selected vertex and edge ids, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    vertices: BTreeSet<VertexId>,
    edges: BTreeSet<EdgeId>,
}

/// What a remap removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemapSummary {
    pub dropped_vertices: usize,
    pub dropped_edges: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole set of `kind`. Returns true if it changed.
    pub fn set_selected(
        &mut self,
        kind: SelectionKind,
        ids: impl IntoIterator<Item = usize>,
    ) -> bool {
        let ids: BTreeSet<usize> = ids.into_iter().collect();
        let set = self.set_mut(kind);
        if *set == ids {
            return false;
        }
        *set = ids;
        true
    }

    /// Selected ids of `kind` in ascending order.
    pub fn get_selected(&self, kind: SelectionKind) -> Vec<usize> {
        self.set(kind).iter().copied().collect()
    }

    pub fn contains(&self, kind: SelectionKind, id: usize) -> bool {
        self.set(kind).contains(&id)
    }

    pub fn len(&self, kind: SelectionKind) -> usize {
        self.set(kind).len()
    }

    /// True if neither vertices nor edges are selected.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty()
    }

    /// Drops ids that do not exist in a generation with the given counts.
    /// Surviving ids stay selected.
    pub fn remap(&mut self, vertex_count: usize, edge_count: usize) -> RemapSummary {
        let vertices_before = self.vertices.len();
        let edges_before = self.edges.len();

        self.vertices.retain(|&v| v < vertex_count);
        self.edges.retain(|&e| e < edge_count);

        RemapSummary {
            dropped_vertices: vertices_before - self.vertices.len(),
            dropped_edges: edges_before - self.edges.len(),
        }
    }

    /// Deselects everything. Returns true if anything was selected.
    pub fn clear(&mut self) -> bool {
        let changed = !self.is_empty();
        self.vertices.clear();
        self.edges.clear();
        changed
    }

    fn set(&self, kind: SelectionKind) -> &BTreeSet<usize> {
        match kind {
            SelectionKind::Vertex => &self.vertices,
            SelectionKind::Edge => &self.edges,
        }
    }

    fn set_mut(&mut self, kind: SelectionKind) -> &mut BTreeSet<usize> {
        match kind {
            SelectionKind::Vertex => &mut self.vertices,
            SelectionKind::Edge => &mut self.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_and_sorts() {
        let mut selection = SelectionState::new();
        assert!(selection.set_selected(SelectionKind::Vertex, [5, 1, 3, 1]));
        assert_eq!(selection.get_selected(SelectionKind::Vertex), vec![1, 3, 5]);

        assert!(selection.set_selected(SelectionKind::Vertex, [2]));
        assert_eq!(selection.get_selected(SelectionKind::Vertex), vec![2]);
        assert!(selection.get_selected(SelectionKind::Edge).is_empty());
    }

    #[test]
    fn test_unchanged_set_reports_false() {
        let mut selection = SelectionState::new();
        selection.set_selected(SelectionKind::Edge, [0, 1]);
        assert!(!selection.set_selected(SelectionKind::Edge, [1, 0]));
    }

    #[test]
    fn test_remap_drops_vanished_ids() {
        let mut selection = SelectionState::new();
        selection.set_selected(SelectionKind::Vertex, [0, 2, 7, 9]);
        selection.set_selected(SelectionKind::Edge, [1, 4]);

        let summary = selection.remap(8, 10);
        assert_eq!(
            summary,
            RemapSummary {
                dropped_vertices: 1,
                dropped_edges: 0
            }
        );
        assert_eq!(selection.get_selected(SelectionKind::Vertex), vec![0, 2, 7]);
        assert_eq!(selection.get_selected(SelectionKind::Edge), vec![1, 4]);

        selection.remap(0, 0);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut selection = SelectionState::new();
        assert!(!selection.clear());

        selection.set_selected(SelectionKind::Vertex, [3]);
        assert!(selection.contains(SelectionKind::Vertex, 3));
        assert!(selection.clear());
        assert_eq!(selection.len(SelectionKind::Vertex), 0);
    }
}
