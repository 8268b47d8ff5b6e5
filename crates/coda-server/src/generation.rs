//! Immutable data snapshots.
//!
//! A generation bundles the tables and the graph index of one successful
//! reload. It is published behind an `Arc` and never mutated; appending
//! derived columns publishes a copy with the same id.

use chrono::{DateTime, Utc};
use coda_core::{Column, DataError, Dataset, Table};
use coda_graph::{GraphIndex, GraphStats};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Generation {
    /// Incremented on every successful reload. Zero before the first.
    pub id: u64,
    pub vertices: Table,
    pub edges: Table,
    pub graph: GraphIndex,
    /// Derived columns appended to this generation's vertex table.
    pub derived: Vec<String>,
    /// Derived columns of an earlier generation that have not been
    /// recomputed since the reload.
    pub stale: Vec<String>,
    pub loaded_at: DateTime<Utc>,
}

impl Generation {
    /// The generation served before anything was loaded.
    pub fn empty() -> Self {
        Self {
            id: 0,
            vertices: Table::new(),
            edges: Table::new(),
            graph: GraphIndex::empty(),
            derived: Vec::new(),
            stale: Vec::new(),
            loaded_at: Utc::now(),
        }
    }

    /// Creates the successor of `previous` from freshly loaded tables.
    ///
    /// Derived columns do not carry over; every derived or stale column
    /// of `previous` is reported stale.
    pub fn next(previous: &Generation, dataset: Dataset, graph: GraphIndex) -> Self {
        let mut stale = previous.stale.clone();
        for name in &previous.derived {
            if !stale.contains(name) {
                stale.push(name.clone());
            }
        }

        Self {
            id: previous.id + 1,
            vertices: dataset.vertices,
            edges: dataset.edges,
            graph,
            derived: Vec::new(),
            stale,
            loaded_at: Utc::now(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.vertex_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns a copy with `columns` appended to the vertex table.
    ///
    /// Every column must have one value per vertex and a name not yet
    /// used. Nothing is appended if any column is rejected.
    pub fn with_derived(&self, columns: Vec<(String, Column)>) -> Result<Self, DataError> {
        let mut next = self.clone();
        for (name, column) in columns {
            if column.len() != self.vertex_count() {
                return Err(DataError::integrity(format!(
                    "derived column '{}' has {} values, expected {}",
                    name,
                    column.len(),
                    self.vertex_count()
                )));
            }
            next.vertices.push_column(name.clone(), column)?;
            next.stale.retain(|s| *s != name);
            next.derived.push(name);
        }
        Ok(next)
    }

    /// Summary sent to clients.
    pub fn info(&self) -> GenerationInfo {
        GenerationInfo {
            id: self.id,
            vertex_count: self.vertex_count(),
            edge_count: self.edge_count(),
            vertex_columns: self.vertices.column_names().map(String::from).collect(),
            edge_columns: self.edges.column_names().map(String::from).collect(),
            derived: self.derived.clone(),
            stale: self.stale.clone(),
            graph: self.graph.stats(),
            loaded_at: self.loaded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationInfo {
    pub id: u64,
    pub vertex_count: usize,
    pub edge_count: usize,
    pub vertex_columns: Vec<String>,
    pub edge_columns: Vec<String>,
    pub derived: Vec<String>,
    pub stale: Vec<String>,
    pub graph: GraphStats,
    pub loaded_at: DateTime<Utc>,
}
