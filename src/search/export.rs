use thiserror::Error;

use crate::search::materialize::ResultTable;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data available: {0}")]
    NoData(String),
    #[error("failed to write delimited export: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush delimited export: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a result table as CSV with a header row of display names.
pub fn write_csv(table: &ResultTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_field()))?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::materialize::Cell;

    #[test]
    fn writes_header_and_quotes_embedded_commas() {
        let table = ResultTable {
            columns: vec!["Employer Name", "State", "Approval Rate"],
            rows: vec![
                vec![
                    Cell::Text("Acme, Inc.".into()),
                    Cell::Text("CA".into()),
                    Cell::Float(0.912),
                ],
                vec![Cell::Text("Globex".into()), Cell::Text("NY".into()), Cell::Empty],
            ],
        };
        let bytes = write_csv(&table).expect("export");
        let text = String::from_utf8(bytes).expect("utf8");
        assert_eq!(
            text,
            "Employer Name,State,Approval Rate\n\"Acme, Inc.\",CA,0.912\nGlobex,NY,\n"
        );
    }
}
