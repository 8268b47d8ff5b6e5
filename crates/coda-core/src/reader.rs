//! CSV ingestion.
//!
//! Every CSV file carries a header row. Column types are inferred from
//! the cells, see [`Column::infer`].

use crate::error::DataError;
use crate::table::{Column, Table};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Reads a CSV file from disk into a table.
///
/// A missing or unreadable file is reported as
/// [`DataError::SourceUnavailable`], malformed content as
/// [`DataError::Parse`].
pub fn read_table(path: &Path) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|source| DataError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let table = read_table_from_reader(file, path)?;
    debug!(
        "Read {} ({} rows, {} columns)",
        path.display(),
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Reads CSV content from any reader. `origin` is only used in errors.
pub fn read_table_from_reader<R: Read>(reader: R, origin: &Path) -> Result<Table, DataError> {
    let parse_error = |e: csv::Error| DataError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        for (column, cell) in cells.iter_mut().zip(record.iter()) {
            column.push(cell.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| (name, Column::infer(values)))
        .collect();

    Table::from_columns(columns).map_err(|e| DataError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}
