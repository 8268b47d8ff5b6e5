//! Edge type for the colony graph.

use crate::{EdgeId, VertexId};
use serde::{Deserialize, Serialize};

/// A directed parent → child relation between two polyps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Row of this edge in the edge table.
    pub id: EdgeId,

    /// The parent (ancestor side).
    pub source: VertexId,

    /// The child (descendant side).
    pub target: VertexId,
}

impl Edge {
    pub fn new(id: EdgeId, source: VertexId, target: VertexId) -> Self {
        Self { id, source, target }
    }

    /// True if the edge starts and ends at the same vertex.
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}
