use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Names of the edge table columns holding the endpoint vertex ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeColumns {
    pub source: String,
    pub target: String,
}

impl Default for EdgeColumns {
    fn default() -> Self {
        Self {
            source: "source".to_string(),
            target: "target".to_string(),
        }
    }
}

impl EdgeColumns {
    /// Both names, for use with [`Table::prefixed`].
    pub fn names(&self) -> [&str; 2] {
        [self.source.as_str(), self.target.as_str()]
    }
}

/// The merged vertex and edge tables produced by one provider reload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub vertices: Table,
    pub edges: Table,
}

impl Dataset {
    pub fn new(vertices: Table, edges: Table) -> Self {
        Self { vertices, edges }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.row_count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.row_count()
    }
}
