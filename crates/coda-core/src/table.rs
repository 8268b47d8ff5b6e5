//! Column-oriented tables.
//!
//! A [`Table`] is an ordered list of named, equally long columns. Vertex
//! and edge feature data both live in tables; rows are addressed by their
//! position only, there is no key column.

use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Columns starting with this prefix are bookkeeping added by CoDA
/// itself and are never offered as data columns.
pub const INTERNAL_PREFIX: &str = "coda:";

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Number(f64),
    Label(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Number(v) => write!(f, "{}", v),
            Value::Label(v) => write!(f, "{}", v),
        }
    }
}

/// The storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Whole numbers, e.g. labels or vertex ids.
    Integer,
    /// Floating point measurements.
    Numeric,
    /// Free text labels.
    Categorical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Integer => "integer",
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
        };
        write!(f, "{}", s)
    }
}

/// A typed column of cell values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum Column {
    Integer(Vec<i64>),
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl Column {
    /// Infers the narrowest column type that can hold all cells.
    ///
    /// Integers win over floats, floats over text. Empty cells are only
    /// tolerated in numeric columns, where they become NaN.
    pub fn infer(cells: Vec<String>) -> Self {
        if cells.iter().all(|c| c.parse::<i64>().is_ok()) {
            return Column::Integer(cells.iter().filter_map(|c| c.parse().ok()).collect());
        }

        let numeric = cells.iter().all(|c| c.is_empty() || c.parse::<f64>().is_ok());
        if numeric {
            return Column::Numeric(
                cells
                    .iter()
                    .map(|c| c.parse::<f64>().unwrap_or(f64::NAN))
                    .collect(),
            );
        }

        Column::Categorical(cells)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Integer(v) => v.len(),
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Integer(_) => ColumnKind::Integer,
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// True for integer and numeric columns.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Column::Categorical(_))
    }

    /// Returns the cell at `row`.
    pub fn get(&self, row: usize) -> Option<Value> {
        match self {
            Column::Integer(v) => v.get(row).copied().map(Value::Integer),
            Column::Numeric(v) => v.get(row).copied().map(Value::Number),
            Column::Categorical(v) => v.get(row).cloned().map(Value::Label),
        }
    }

    /// Returns the cell at `row` as a float, if the column is scalar.
    pub fn as_f64(&self, row: usize) -> Option<f64> {
        match self {
            Column::Integer(v) => v.get(row).map(|x| *x as f64),
            Column::Numeric(v) => v.get(row).copied(),
            Column::Categorical(_) => None,
        }
    }
}

/// An ordered set of equally long, uniquely named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<(String, Column)>,
    row_count: usize,
}

impl Table {
    /// Creates an empty table without rows or columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from named columns, validating their lengths.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, DataError> {
        let mut table = Table::new();
        for (name, column) in columns {
            table.push_column(name, column)?;
        }
        Ok(table)
    }

    /// Appends a column.
    ///
    /// The first column fixes the row count; every further column must
    /// match it. Column names must be unique.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), DataError> {
        let name = name.into();

        if self.contains_column(&name) {
            return Err(DataError::integrity(format!("duplicate column '{}'", name)));
        }

        if self.columns.is_empty() {
            self.row_count = column.len();
        } else if column.len() != self.row_count {
            return Err(DataError::integrity(format!(
                "column '{}' has {} rows, expected {}",
                name,
                column.len(),
                self.row_count
            )));
        }

        self.columns.push((name, column));
        Ok(())
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True if the table has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, column)| column)
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Iterates over the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Iterates over all columns in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Returns a copy with every column renamed to `<prefix>:<name>`.
    ///
    /// Columns listed in `keep` keep their plain name. An empty prefix
    /// leaves all names untouched.
    pub fn prefixed(&self, prefix: &str, keep: &[&str]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|(name, column)| {
                let renamed = if prefix.is_empty() || keep.contains(&name.as_str()) {
                    name.clone()
                } else {
                    format!("{}:{}", prefix, name)
                };
                (renamed, column.clone())
            })
            .collect();

        Table {
            columns,
            row_count: self.row_count,
        }
    }

    /// Joins tables side by side by row position.
    ///
    /// Tables without columns are ignored. All others must have the
    /// same number of rows and disjoint column names.
    pub fn hconcat(tables: Vec<Table>) -> Result<Table, DataError> {
        let mut merged = Table::new();
        for table in tables.into_iter().filter(|t| !t.is_empty()) {
            if !merged.is_empty() && table.row_count != merged.row_count {
                return Err(DataError::integrity(format!(
                    "cannot join tables positionally: {} rows vs {} rows",
                    merged.row_count, table.row_count
                )));
            }
            for (name, column) in table.columns {
                merged.push_column(name, column)?;
            }
        }
        Ok(merged)
    }

    /// All columns that are not CoDA bookkeeping.
    pub fn data_columns(&self) -> Vec<&str> {
        self.column_names()
            .filter(|name| !name.starts_with(INTERNAL_PREFIX))
            .collect()
    }

    /// Data columns holding numbers.
    pub fn scalar_columns(&self) -> Vec<&str> {
        self.data_columns_where(|c| c.is_scalar())
    }

    /// Data columns holding text.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.data_columns_where(|c| c.kind() == ColumnKind::Categorical)
    }

    /// Data columns holding whole numbers.
    pub fn integral_columns(&self) -> Vec<&str> {
        self.data_columns_where(|c| c.kind() == ColumnKind::Integer)
    }

    /// Columns usable as labels: categorical first, then integral.
    pub fn label_columns(&self) -> Vec<&str> {
        let mut columns = self.categorical_columns();
        columns.extend(self.integral_columns());
        columns
    }

    fn data_columns_where(&self, predicate: impl Fn(&Column) -> bool) -> Vec<&str> {
        let data: HashSet<&str> = self.data_columns().into_iter().collect();
        self.columns
            .iter()
            .filter(|(name, column)| data.contains(name.as_str()) && predicate(column))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_column_types() {
        assert_eq!(
            Column::infer(cells(&["1", "2", "-3"])),
            Column::Integer(vec![1, 2, -3])
        );
        assert_eq!(
            Column::infer(cells(&["1", "2.5"])).kind(),
            ColumnKind::Numeric
        );
        assert_eq!(
            Column::infer(cells(&["a", "2"])),
            Column::Categorical(cells(&["a", "2"]))
        );

        match Column::infer(cells(&["1.5", ""])) {
            Column::Numeric(v) => {
                assert_eq!(v[0], 1.5);
                assert!(v[1].is_nan());
            }
            other => panic!("expected numeric column, got {:?}", other),
        }
    }

    #[test]
    fn test_push_column_checks_rows() {
        let mut table = Table::new();
        table.push_column("a", Column::Integer(vec![1, 2])).unwrap();

        let err = table
            .push_column("b", Column::Integer(vec![1, 2, 3]))
            .unwrap_err();
        assert!(err.is_integrity());

        let err = table.push_column("a", Column::Integer(vec![3, 4])).unwrap_err();
        assert!(err.is_integrity());

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_prefix_keeps_listed_columns() {
        let table = Table::from_columns(vec![
            ("source".into(), Column::Integer(vec![0])),
            ("length".into(), Column::Numeric(vec![1.0])),
        ])
        .unwrap();

        let prefixed = table.prefixed("edges", &["source"]);
        let names: Vec<&str> = prefixed.column_names().collect();
        assert_eq!(names, vec!["source", "edges:length"]);

        let untouched = table.prefixed("", &[]);
        assert_eq!(untouched, table);
    }

    #[test]
    fn test_hconcat_positional_join() {
        let a = Table::from_columns(vec![("a".into(), Column::Integer(vec![1, 2]))]).unwrap();
        let b = Table::from_columns(vec![("b".into(), Column::Numeric(vec![0.5, 1.5]))]).unwrap();

        let merged = Table::hconcat(vec![a.clone(), Table::new(), b]).unwrap();
        assert_eq!(merged.row_count(), 2);
        assert_eq!(merged.column_count(), 2);
        assert_eq!(merged.column("a").and_then(|c| c.get(1)), Some(Value::Integer(2)));
        assert_eq!(merged.column("b").and_then(|c| c.get(1)), Some(Value::Number(1.5)));

        let short = Table::from_columns(vec![("c".into(), Column::Integer(vec![1]))]).unwrap();
        let err = Table::hconcat(vec![a, short]).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn test_column_classification() {
        let table = Table::from_columns(vec![
            ("label".into(), Column::Integer(vec![1, 2])),
            ("volume".into(), Column::Numeric(vec![0.1, 0.2])),
            ("species".into(), Column::Categorical(cells(&["a", "b"]))),
            ("coda:color".into(), Column::Categorical(cells(&["#fff", "#000"]))),
        ])
        .unwrap();

        assert_eq!(table.data_columns(), vec!["label", "volume", "species"]);
        assert_eq!(table.scalar_columns(), vec!["label", "volume"]);
        assert_eq!(table.categorical_columns(), vec!["species"]);
        assert_eq!(table.integral_columns(), vec!["label"]);
        assert_eq!(table.label_columns(), vec!["species", "label"]);
    }

    #[test]
    fn test_column_serialization() {
        let column = Column::Integer(vec![4, 5]);
        let json = serde_json::to_string(&column).unwrap();
        assert_eq!(json, r#"{"kind":"integer","values":[4,5]}"#);
    }
}
