use crate::{EdgeId, VertexId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An edge points at a vertex that does not exist.
    #[error("Edge {edge} references vertex {vertex}, but only {vertex_count} vertices exist")]
    DanglingEdge {
        edge: EdgeId,
        vertex: VertexId,
        vertex_count: usize,
    },

    /// The edge table lacks one of the designated id columns.
    #[error("Edge table has no '{0}' column")]
    MissingColumn(String),

    /// An id cell is negative, fractional or not a number.
    #[error("Edge {edge}: '{value}' in column '{column}' is not a vertex id")]
    InvalidId {
        edge: EdgeId,
        column: String,
        value: String,
    },

    /// A traversal root is not a vertex of the current graph.
    #[error("Vertex {vertex} is out of range (graph has {vertex_count} vertices)")]
    OutOfRange { vertex: VertexId, vertex_count: usize },
}

impl GraphError {
    /// True for errors caused by inconsistent edge data. These abort a
    /// reload; [`GraphError::OutOfRange`] only rejects a single request.
    pub fn is_data_integrity(&self) -> bool {
        !matches!(self, GraphError::OutOfRange { .. })
    }
}
