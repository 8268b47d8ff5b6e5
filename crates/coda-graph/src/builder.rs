//! Graph builder for constructing the index from an edge table.
//!
//! The builder reads the designated source/target columns, checks that
//! every cell is a vertex id, and hands the pairs to
//! [`GraphIndex::build`].

use crate::error::GraphError;
use crate::graph::GraphIndex;
use crate::{EdgeId, VertexId};
use coda_core::{Column, EdgeColumns, Table};
use tracing::debug;

/// Builds a GraphIndex from edge pairs or an edge table.
pub struct GraphBuilder {
    vertex_count: usize,
    pairs: Vec<(VertexId, VertexId)>,
}

impl GraphBuilder {
    /// Creates a builder for a graph with `vertex_count` vertices.
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            pairs: Vec::new(),
        }
    }

    /// Adds a single edge and returns its id.
    pub fn add_edge(&mut self, source: VertexId, target: VertexId) -> EdgeId {
        self.pairs.push((source, target));
        self.pairs.len() - 1
    }

    /// Adds all edges of an edge table.
    ///
    /// A table without any columns contributes no edges. A table with
    /// columns must contain both id columns.
    pub fn add_table(&mut self, table: &Table, columns: &EdgeColumns) -> Result<(), GraphError> {
        let pairs = edges_from_table(table, columns)?;
        self.pairs.extend(pairs);
        Ok(())
    }

    /// Finishes building and returns the index.
    pub fn build(self) -> Result<GraphIndex, GraphError> {
        let index = GraphIndex::build(self.vertex_count, &self.pairs)?;
        debug!(
            "Built graph index: {} vertices, {} edges",
            index.vertex_count(),
            index.edge_count()
        );
        Ok(index)
    }
}

/// Extracts the ordered `(source, target)` pairs of an edge table.
pub fn edges_from_table(
    table: &Table,
    columns: &EdgeColumns,
) -> Result<Vec<(VertexId, VertexId)>, GraphError> {
    if table.is_empty() {
        return Ok(Vec::new());
    }

    let sources = id_column(table, &columns.source)?;
    let targets = id_column(table, &columns.target)?;
    Ok(sources.into_iter().zip(targets).collect())
}

fn id_column(table: &Table, name: &str) -> Result<Vec<VertexId>, GraphError> {
    let column = table
        .column(name)
        .ok_or_else(|| GraphError::MissingColumn(name.to_string()))?;

    let invalid = |edge: usize, value: String| GraphError::InvalidId {
        edge,
        column: name.to_string(),
        value,
    };

    match column {
        Column::Integer(values) => values
            .iter()
            .enumerate()
            .map(|(edge, v)| usize::try_from(*v).map_err(|_| invalid(edge, v.to_string())))
            .collect(),
        Column::Numeric(values) => values
            .iter()
            .enumerate()
            .map(|(edge, v)| {
                if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 {
                    Ok(*v as VertexId)
                } else {
                    Err(invalid(edge, v.to_string()))
                }
            })
            .collect(),
        Column::Categorical(values) => values
            .iter()
            .enumerate()
            .map(|(edge, v)| {
                v.trim()
                    .parse::<VertexId>()
                    .map_err(|_| invalid(edge, v.clone()))
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_table(sources: Column, targets: Column) -> Table {
        Table::from_columns(vec![
            ("source".into(), sources),
            ("target".into(), targets),
            ("length".into(), Column::Numeric(vec![1.0, 2.0])),
        ])
        .unwrap()
    }

    #[test]
    fn test_builder_from_table() {
        let table = edge_table(Column::Integer(vec![0, 1]), Column::Integer(vec![1, 2]));

        let mut builder = GraphBuilder::new(3);
        builder.add_table(&table, &EdgeColumns::default()).unwrap();
        let index = builder.build().unwrap();

        assert_eq!(index.edge_count(), 2);
        assert_eq!(index.children(1), &[2]);
    }

    #[test]
    fn test_whole_floats_are_ids() {
        let table = edge_table(Column::Numeric(vec![0.0, 1.0]), Column::Numeric(vec![1.0, 2.0]));
        let pairs = edges_from_table(&table, &EdgeColumns::default()).unwrap();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_invalid_ids() {
        let negative = edge_table(Column::Integer(vec![0, -1]), Column::Integer(vec![1, 2]));
        let err = edges_from_table(&negative, &EdgeColumns::default()).unwrap_err();
        assert_eq!(
            err,
            GraphError::InvalidId {
                edge: 1,
                column: "source".into(),
                value: "-1".into()
            }
        );

        let fractional = edge_table(Column::Integer(vec![0, 1]), Column::Numeric(vec![1.5, 2.0]));
        let err = edges_from_table(&fractional, &EdgeColumns::default()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidId { edge: 0, .. }));

        let text = edge_table(
            Column::Categorical(vec!["a".into(), "b".into()]),
            Column::Integer(vec![1, 2]),
        );
        assert!(edges_from_table(&text, &EdgeColumns::default())
            .unwrap_err()
            .is_data_integrity());

        // Text columns are checked cell by cell; the first bad cell is reported.
        let mixed = edge_table(
            Column::Categorical(vec!["3".into(), "x".into()]),
            Column::Integer(vec![1, 2]),
        );
        assert_eq!(
            edges_from_table(&mixed, &EdgeColumns::default()).unwrap_err(),
            GraphError::InvalidId {
                edge: 1,
                column: "source".into(),
                value: "x".into()
            }
        );
    }

    #[test]
    fn test_custom_column_names() {
        let table = Table::from_columns(vec![
            ("parent".into(), Column::Integer(vec![2])),
            ("child".into(), Column::Integer(vec![0])),
        ])
        .unwrap();
        let columns = EdgeColumns {
            source: "parent".into(),
            target: "child".into(),
        };

        assert_eq!(edges_from_table(&table, &columns).unwrap(), vec![(2, 0)]);
        assert_eq!(
            edges_from_table(&table, &EdgeColumns::default()).unwrap_err(),
            GraphError::MissingColumn("source".into())
        );
    }

    #[test]
    fn test_empty_table_has_no_edges() {
        let mut builder = GraphBuilder::new(2);
        builder.add_table(&Table::new(), &EdgeColumns::default()).unwrap();
        let first = builder.add_edge(1, 0);
        assert_eq!(first, 0);

        let index = builder.build().unwrap();
        assert_eq!(index.parents(0), &[1]);
    }
}
