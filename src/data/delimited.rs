//! Delimited-text (CSV) source reader.

use std::path::Path;

use crate::data::loader::{check_required, columns_from_mapping, LoadError, ParsedSource, RowValues};
use crate::data::record::{Column, DataYear};

pub fn read_delimited(
    path: &Path,
    year: DataYear,
    limit: Option<usize>,
) -> Result<ParsedSource, LoadError> {
    let csv_error = |source: csv::Error| LoadError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    let mapping: Vec<Option<Column>> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(Column::from_header)
        .collect();
    let columns = columns_from_mapping(&mapping);
    check_required(path, &columns)?;

    let mut parsed = ParsedSource::new(columns);
    for (index, result) in reader.records().enumerate() {
        if limit.is_some_and(|max| index >= max) {
            break;
        }
        let record = result.map_err(csv_error)?;
        let mut row = RowValues::default();
        for (column, cell) in mapping.iter().zip(record.iter()) {
            let Some(column) = *column else {
                continue;
            };
            if row.set_text(column, cell).is_err() {
                return Err(LoadError::InvalidValue {
                    path: path.display().to_string(),
                    // 1-based, counting the header line.
                    row: index + 2,
                    column,
                    value: cell.to_string(),
                });
            }
        }
        parsed.push(row, year);
    }
    Ok(parsed)
}
