//! Provenance registry: which source files made it into the loaded table.
//! Read by the health endpoint and `inspect_sources` to show "data as of".

use serde::Serialize;

use crate::data::record::DataYear;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Parquet,
    Delimited,
}

impl SourceFormat {
    /// `.parquet` files are columnar; anything else is read as delimited text.
    pub fn from_path(path: &str) -> Self {
        let is_parquet = std::path::Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
        if is_parquet {
            Self::Parquet
        } else {
            Self::Delimited
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadedSource {
    pub path: String,
    pub year: DataYear,
    pub format: SourceFormat,
    pub rows: usize,
    /// Rows dropped for an empty employer name or state.
    pub dropped_rows: usize,
    /// Loaded by the year-diversity retry rather than the main pass.
    pub diversity_fill: bool,
    pub loaded_at: String,
}

/// Accepted sources in load order.
pub type Registry = Vec<LoadedSource>;
