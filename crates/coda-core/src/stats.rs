//! Summary statistics of scalar columns.
//!
//! Mirrors what a spreadsheet "describe" shows: count, distinct values,
//! mean, sample standard deviation, extrema and quartiles. NaN cells are
//! ignored throughout.

use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Statistics of one scalar column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Describes every scalar data column of `table`.
///
/// With `rows` given, only those rows are considered. An empty row list
/// means "no selection" and describes the whole table.
pub fn describe(table: &Table, rows: Option<&[usize]>) -> Vec<ColumnSummary> {
    let rows: Vec<usize> = match rows {
        Some(rows) if !rows.is_empty() => rows.to_vec(),
        _ => (0..table.row_count()).collect(),
    };

    table
        .scalar_columns()
        .into_iter()
        .filter_map(|name| {
            let column = table.column(name)?;
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| column.as_f64(*row))
                .filter(|v| !v.is_nan())
                .collect();
            Some(summarize(name, values))
        })
        .collect()
}

fn summarize(name: &str, mut values: Vec<f64>) -> ColumnSummary {
    let count = values.len();
    let unique = values
        .iter()
        .map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
        .collect::<HashSet<_>>()
        .len();

    if count == 0 {
        return ColumnSummary {
            column: name.to_string(),
            count,
            unique,
            mean: None,
            std: None,
            min: None,
            q25: None,
            q50: None,
            q75: None,
            max: None,
        };
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    } else {
        None
    };

    ColumnSummary {
        column: name.to_string(),
        count,
        unique,
        mean: Some(mean),
        std,
        min: values.first().copied(),
        q25: Some(quantile(&values, 0.25)),
        q50: Some(quantile(&values, 0.50)),
        q75: Some(quantile(&values, 0.75)),
        max: values.last().copied(),
    }
}

/// Linear interpolation between closest ranks; `sorted` must not be empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn table() -> Table {
        Table::from_columns(vec![
            ("volume".into(), Column::Numeric(vec![1.0, 2.0, 3.0, 4.0, f64::NAN])),
            ("label".into(), Column::Integer(vec![1, 1, 2, 2, 3])),
            (
                "species".into(),
                Column::Categorical(vec!["a".into(); 5]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_describe_all_rows() {
        let summary = describe(&table(), None);
        assert_eq!(summary.len(), 2);

        let volume = &summary[0];
        assert_eq!(volume.column, "volume");
        assert_eq!(volume.count, 4);
        assert_eq!(volume.unique, 4);
        assert_eq!(volume.mean, Some(2.5));
        assert_eq!(volume.min, Some(1.0));
        assert_eq!(volume.max, Some(4.0));
        assert_eq!(volume.q25, Some(1.75));
        assert_eq!(volume.q50, Some(2.5));
        assert_eq!(volume.q75, Some(3.25));

        let std = volume.std.unwrap();
        assert!((std - 1.290_994_448_735_805_6).abs() < 1e-12);

        assert_eq!(summary[1].unique, 3);
    }

    #[test]
    fn test_describe_selection() {
        let summary = describe(&table(), Some(&[2, 3]));
        let label = summary.iter().find(|s| s.column == "label").unwrap();
        assert_eq!(label.count, 2);
        assert_eq!(label.mean, Some(2.0));
        assert_eq!(label.std, Some(0.0));
    }

    #[test]
    fn test_describe_empty_selection_means_everything() {
        let all = describe(&table(), None);
        let empty = describe(&table(), Some(&[]));
        assert_eq!(all[1], empty[1]);
    }

    #[test]
    fn test_describe_only_nan() {
        let summary = describe(&table(), Some(&[4]));
        let volume = &summary[0];
        assert_eq!(volume.count, 0);
        assert_eq!(volume.mean, None);
        assert_eq!(volume.std, None);
    }
}
