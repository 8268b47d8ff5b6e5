//! CoDA Core - Tabular data for coral colony analysis
//!
//! This crate holds the data model everything else in CoDA works with:
//! column-oriented vertex and edge tables, the CSV ingestion that fills
//! them, and the statistics computed over them.
//!
//! # Data model
//!
//! A vertex is identified by its row index in the merged vertex table,
//! an edge by its row index in the merged edge table. Several CSV files
//! are joined positionally, so every file of one kind must have the same
//! number of rows.
//!
//! # Example
//!
//! ```no_run
//! use coda_core::{read_table, Table};
//! use std::path::Path;
//!
//! let polyps = read_table(Path::new("polyps.csv"))?;
//! let shape = read_table(Path::new("shape.csv"))?;
//!
//! let vertices = Table::hconcat(vec![
//!     polyps.prefixed("polyps", &[]),
//!     shape.prefixed("shape", &[]),
//! ])?;
//! println!("{} vertices", vertices.row_count());
//! # Ok::<(), coda_core::DataError>(())
//! ```

mod dataset;
mod error;
mod reader;
mod selection_io;
mod stats;
mod table;

pub use dataset::{Dataset, EdgeColumns};
pub use error::DataError;
pub use reader::{read_table, read_table_from_reader};
pub use selection_io::{read_selection_mask, write_selection};
pub use stats::{describe, ColumnSummary};
pub use table::{Column, ColumnKind, Table, Value, INTERNAL_PREFIX};

/// Row index of a vertex in the merged vertex table.
pub type VertexId = usize;

/// Row index of an edge in the merged edge table.
pub type EdgeId = usize;
