//! Dataset loader: reads the configured sources in order, stamps provenance years,
//! enforces the required-column contract and concatenates what survives.
//!
//! A source that is missing, unreadable or lacks required columns is logged and skipped.
//! Only "nothing loaded at all" is fatal ([LoadError::NoData]).

use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::data::columnar::read_parquet;
use crate::data::delimited::read_delimited;
use crate::data::record::{Column, ColumnSet, DataYear, EmployerRecord};
use crate::data::registry::{LoadedSource, SourceFormat};
use crate::data::table::EmployerTable;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read delimited source '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read parquet source '{path}': {source}")]
    Parquet {
        path: String,
        #[source]
        source: parquet::errors::ParquetError,
    },
    #[error("failed to decode columns of '{path}': {source}")]
    Arrow {
        path: String,
        #[source]
        source: arrow::error::ArrowError,
    },
    #[error("'{path}' is missing required columns {missing:?}")]
    MissingColumns { path: String, missing: Vec<Column> },
    #[error("'{path}' row {row}: cannot parse {column} value '{value}'")]
    InvalidValue {
        path: String,
        row: usize,
        column: Column,
        value: String,
    },
    #[error("no valid data files found ({attempted} sources configured)")]
    NoData { attempted: usize },
}

/// Rows parsed from one source, before provenance bookkeeping.
#[derive(Debug, Default)]
pub struct ParsedSource {
    pub records: Vec<EmployerRecord>,
    pub columns: ColumnSet,
    pub dropped_rows: usize,
}

impl ParsedSource {
    pub(crate) fn new(columns: ColumnSet) -> Self {
        Self {
            records: Vec::new(),
            columns,
            dropped_rows: 0,
        }
    }

    pub(crate) fn push(&mut self, row: RowValues, year: DataYear) {
        match row.into_record(year) {
            Some(record) => self.records.push(record),
            None => self.dropped_rows += 1,
        }
    }
}

/// Cell values for one row, keyed by known column.
#[derive(Debug, Default)]
pub(crate) struct RowValues {
    pub employer_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub classifications: Option<String>,
    pub cap_exempt_score: Option<f64>,
    pub approval_rate: Option<f64>,
    pub total_petitions: Option<i64>,
    pub likely_cap_exempt: Option<bool>,
}

impl RowValues {
    /// Parse a raw text cell into the slot for `column`. Returns `Err(())` when the
    /// cell is not a valid value for a numeric or boolean column.
    pub(crate) fn set_text(&mut self, column: Column, raw: &str) -> Result<(), ()> {
        match column {
            Column::EmployerName => self.employer_name = text_cell(raw),
            Column::City => self.city = text_cell(raw),
            Column::State => self.state = text_cell(raw),
            Column::Classifications => self.classifications = text_cell(raw),
            Column::CapExemptScore => self.cap_exempt_score = float_cell(raw)?,
            Column::ApprovalRate => self.approval_rate = float_cell(raw)?,
            Column::TotalPetitions => self.total_petitions = int_cell(raw)?,
            Column::LikelyCapExempt => self.likely_cap_exempt = bool_cell(raw)?,
            // Provenance comes from the source declaration, never the file.
            Column::DataYear => {}
        }
        Ok(())
    }

    fn into_record(self, data_year: DataYear) -> Option<EmployerRecord> {
        let employer_name = self.employer_name.filter(|s| !s.trim().is_empty())?;
        let state = self.state.filter(|s| !s.trim().is_empty())?;
        Some(EmployerRecord {
            employer_name,
            city: self.city,
            state,
            data_year,
            classifications: self.classifications,
            cap_exempt_score: self.cap_exempt_score,
            approval_rate: self.approval_rate,
            total_petitions: self.total_petitions,
            likely_cap_exempt: self.likely_cap_exempt,
        })
    }
}

const NA_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

fn is_missing(raw: &str) -> bool {
    NA_TOKENS.contains(&raw.trim())
}

pub(crate) fn text_cell(raw: &str) -> Option<String> {
    if is_missing(raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn float_cell(raw: &str) -> Result<Option<f64>, ()> {
    if is_missing(raw) {
        return Ok(None);
    }
    raw.trim().parse::<f64>().map(Some).map_err(|_| ())
}

fn int_cell(raw: &str) -> Result<Option<i64>, ()> {
    if is_missing(raw) {
        return Ok(None);
    }
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(Some(value));
    }
    // Integer columns with gaps are often written as floats ("12.0").
    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.is_finite() => Ok(Some(value as i64)),
        _ => Err(()),
    }
}

fn bool_cell(raw: &str) -> Result<Option<bool>, ()> {
    if is_missing(raw) {
        return Ok(None);
    }
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Ok(Some(true)),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Ok(Some(false)),
        _ => Err(()),
    }
}

/// Column set for a header mapping. `data_year` is always present since the loader stamps it.
pub(crate) fn columns_from_mapping(mapping: &[Option<Column>]) -> ColumnSet {
    let mut columns: ColumnSet = mapping.iter().flatten().copied().collect();
    columns.insert(Column::DataYear);
    columns
}

pub(crate) fn check_required(path: &Path, columns: &ColumnSet) -> Result<(), LoadError> {
    let missing = columns.missing_required();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns {
            path: path.display().to_string(),
            missing,
        })
    }
}

/// Read one source into a single-source table plus its provenance entry.
pub fn load_source(
    path: &Path,
    year: DataYear,
    limit: Option<usize>,
) -> Result<(EmployerTable, LoadedSource), LoadError> {
    let path_str = path.display().to_string();
    let format = SourceFormat::from_path(&path_str);
    let parsed = match format {
        SourceFormat::Parquet => read_parquet(path, year, limit)?,
        SourceFormat::Delimited => read_delimited(path, year, limit)?,
    };
    let source = LoadedSource {
        path: path_str,
        year,
        format,
        rows: parsed.records.len(),
        dropped_rows: parsed.dropped_rows,
        diversity_fill: false,
        loaded_at: chrono::Utc::now().to_rfc3339(),
    };
    Ok((EmployerTable::from_records(parsed.records, parsed.columns), source))
}

/// Load every configured source in order and concatenate the accepted ones.
pub fn load_sources(config: &AppConfig) -> Result<EmployerTable, LoadError> {
    let mut parts: Vec<(EmployerTable, LoadedSource)> = Vec::new();
    let mut loaded_years: BTreeSet<DataYear> = BTreeSet::new();

    for spec in &config.sources {
        let path = config.resolve(&spec.file);
        if !path.exists() {
            debug!(path = %path.display(), year = %spec.year, "source not found; skipping");
            continue;
        }
        match load_source(&path, spec.year, spec.limit) {
            Ok((part, source)) => {
                info!(
                    path = %source.path,
                    year = %source.year,
                    rows = source.rows,
                    dropped = source.dropped_rows,
                    "loaded source"
                );
                loaded_years.insert(spec.year);
                let short_circuit = spec.primary && source.format == SourceFormat::Parquet;
                parts.push((part, source));
                if short_circuit {
                    info!(
                        path = %path.display(),
                        "primary columnar source loaded; remaining sources skipped"
                    );
                    break;
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "skipping source"),
        }
    }

    if parts.is_empty() {
        error!(attempted = config.sources.len(), "no valid data files found");
        return Err(LoadError::NoData {
            attempted: config.sources.len(),
        });
    }

    if loaded_years.len() == 1 && !loaded_years.contains(&DataYear::Y2025) {
        if let Some(part) = load_diversity_fill(config) {
            parts.push(part);
        }
    }

    let table = EmployerTable::concat(parts);
    let years: Vec<&str> = table.years().iter().map(DataYear::as_str).collect();
    info!(records = table.len(), years = ?years, "dataset ready");
    Ok(table)
}

/// Only one non-2025 year loaded: pull a bounded slice of the first readable 2025 source.
fn load_diversity_fill(config: &AppConfig) -> Option<(EmployerTable, LoadedSource)> {
    info!("single year loaded; looking for 2025 data");
    for spec in config.sources.iter().filter(|s| s.year == DataYear::Y2025) {
        let path = config.resolve(&spec.file);
        if !path.exists() {
            continue;
        }
        match load_source(&path, DataYear::Y2025, Some(config.diversity_row_limit)) {
            Ok((part, mut source)) => {
                source.diversity_fill = true;
                info!(path = %source.path, rows = source.rows, "added 2025 records");
                return Some((part, source));
            }
            Err(err) => warn!(path = %path.display(), error = %err, "failed to load 2025 data"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn na_tokens_are_missing() {
        assert_eq!(text_cell("NaN"), None);
        assert_eq!(text_cell("  "), None);
        assert_eq!(text_cell("Boston"), Some("Boston".to_string()));
    }

    #[test]
    fn integer_cells_accept_integral_floats() {
        assert_eq!(int_cell("12"), Ok(Some(12)));
        assert_eq!(int_cell("12.0"), Ok(Some(12)));
        assert_eq!(int_cell("12.5"), Err(()));
        assert_eq!(int_cell(""), Ok(None));
    }

    #[test]
    fn bool_cells_accept_common_spellings() {
        assert_eq!(bool_cell("True"), Ok(Some(true)));
        assert_eq!(bool_cell("no"), Ok(Some(false)));
        assert_eq!(bool_cell("maybe"), Err(()));
    }

    #[test]
    fn rows_without_name_or_state_are_dropped() {
        let mut parsed = ParsedSource::new(ColumnSet::new());
        parsed.push(
            RowValues {
                employer_name: Some("Acme".to_string()),
                state: Some("CA".to_string()),
                ..RowValues::default()
            },
            DataYear::Y2024,
        );
        parsed.push(
            RowValues {
                employer_name: Some("   ".to_string()),
                state: Some("CA".to_string()),
                ..RowValues::default()
            },
            DataYear::Y2024,
        );
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.dropped_rows, 1);
        assert_eq!(parsed.records[0].data_year, DataYear::Y2024);
    }
}
