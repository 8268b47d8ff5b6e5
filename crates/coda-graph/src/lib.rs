//! CoDA Graph - Colony ancestry graph
//!
//! This crate turns the edge table of a colony into an adjacency index
//! and answers the questions the subgraph selection tool asks: which
//! polyps descend from these, which are their ancestors, and which
//! belong to the same colony fragment.
//!
//! # Architecture
//!
//! The index keeps two ordered adjacency lists per vertex:
//! - children (outgoing edges, parent → child)
//! - parents (incoming edges)
//!
//! Both are in edge-table order so traversals are reproducible.
//! Whole-graph statistics go through petgraph.
//!
//! # Example
//!
//! ```
//! use coda_graph::{GraphIndex, TraversalMode};
//!
//! let index = GraphIndex::build(6, &[(0, 1), (1, 2), (1, 3), (4, 5)]).unwrap();
//!
//! let subtree = index.closure(&[0], TraversalMode::Descendants).unwrap();
//! assert_eq!(subtree, vec![0, 1, 2, 3]);
//! ```

mod builder;
mod edge;
mod error;
mod graph;
mod traversal;

pub use builder::{edges_from_table, GraphBuilder};
pub use edge::Edge;
pub use error::GraphError;
pub use graph::{GraphIndex, GraphStats};
pub use traversal::TraversalMode;

pub use coda_core::{EdgeId, VertexId};
