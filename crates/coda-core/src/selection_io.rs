//! Reading and writing selections as one-column CSV files.

use crate::error::DataError;
use crate::VertexId;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::fs::File;
use std::path::Path;

/// Reads a per-vertex selection mask.
///
/// The file holds one value per vertex row. Rows with a non-zero value
/// are selected. A non-numeric first row is treated as a header.
pub fn read_selection_mask(path: &Path) -> Result<Vec<VertexId>, DataError> {
    let file = File::open(path).map_err(|source| DataError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut selected = Vec::new();
    let mut row = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DataError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cell = record.get(0).unwrap_or("");

        match cell.parse::<f64>() {
            Ok(value) => {
                if value != 0.0 && !value.is_nan() {
                    selected.push(row);
                }
                row += 1;
            }
            Err(_) if line == 0 => continue,
            Err(_) => {
                return Err(DataError::Parse {
                    path: path.to_path_buf(),
                    message: format!("line {}: '{}' is not a mask value", line + 1, cell),
                })
            }
        }
    }

    Ok(selected)
}

/// Writes selected ids to `path`, one per row below an `index` header.
pub fn write_selection(path: &Path, ids: &[usize]) -> Result<(), DataError> {
    let write_error = |message: String| DataError::Write {
        path: path.to_path_buf(),
        message,
    };

    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| write_error(e.to_string()))?;

    writer
        .write_record(["index"])
        .map_err(|e| write_error(e.to_string()))?;
    for id in ids {
        writer
            .write_record([id.to_string()])
            .map_err(|e| write_error(e.to_string()))?;
    }
    writer.flush().map_err(|e| write_error(e.to_string()))?;
    Ok(())
}
