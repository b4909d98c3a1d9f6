//! Query entry points over the startup-loaded table.
//!
//! Every query runs filter -> deduplicate -> materialize on its own working set of row
//! references, so a shared `SearchEngine` needs no locking.

pub mod dedup;
pub mod export;
pub mod filter;
pub mod materialize;
pub mod query;

use serde::Serialize;
use tracing::debug;

use crate::data::facets::{derive_facets, Facets};
use crate::data::loader::LoadError;
use crate::data::table::EmployerTable;

use self::export::{write_csv, ExportError};
use self::materialize::{
    materialize, summary_text, ChartData, OutputShape, ResultSummary, ResultTable,
};
use self::query::SearchQuery;

pub const NO_DATA_MESSAGE: &str = "No data available";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Ready,
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub availability: Availability,
    pub table: ResultTable,
    pub summary: ResultSummary,
    pub summary_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
}

impl SearchResponse {
    fn no_data() -> Self {
        Self {
            availability: Availability::NoData,
            table: ResultTable::default(),
            summary: ResultSummary::default(),
            summary_text: NO_DATA_MESSAGE.to_string(),
            chart: None,
        }
    }
}

#[derive(Debug)]
enum EngineState {
    Ready(EmployerTable),
    NoData(String),
}

#[derive(Debug)]
pub struct SearchEngine {
    state: EngineState,
}

impl SearchEngine {
    pub fn new(table: EmployerTable) -> Self {
        Self {
            state: EngineState::Ready(table),
        }
    }

    /// Engine that answers every query with the no-data state.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: EngineState::NoData(reason.into()),
        }
    }

    pub fn from_load(result: Result<EmployerTable, LoadError>) -> Self {
        match result {
            Ok(table) => Self::new(table),
            Err(err) => Self::unavailable(err.to_string()),
        }
    }

    pub fn table(&self) -> Option<&EmployerTable> {
        match &self.state {
            EngineState::Ready(table) => Some(table),
            EngineState::NoData(_) => None,
        }
    }

    pub fn availability(&self) -> Availability {
        match self.state {
            EngineState::Ready(_) => Availability::Ready,
            EngineState::NoData(_) => Availability::NoData,
        }
    }

    /// Why the engine has no data, if it has none.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            EngineState::Ready(_) => None,
            EngineState::NoData(reason) => Some(reason),
        }
    }

    /// Bounded preview with summary and chart.
    pub fn search(&self, query: &SearchQuery) -> SearchResponse {
        self.run_query(query, OutputShape::Bounded)
    }

    /// Every matching employer, no chart.
    pub fn full_results(&self, query: &SearchQuery) -> SearchResponse {
        self.run_query(query, OutputShape::Unbounded)
    }

    /// CSV bytes of [SearchEngine::full_results] for the same query.
    pub fn export(&self, query: &SearchQuery) -> Result<Vec<u8>, ExportError> {
        if let EngineState::NoData(reason) = &self.state {
            return Err(ExportError::NoData(reason.clone()));
        }
        write_csv(&self.full_results(query).table)
    }

    pub fn facets(&self) -> Facets {
        self.table().map(derive_facets).unwrap_or_default()
    }

    fn run_query(&self, query: &SearchQuery, shape: OutputShape) -> SearchResponse {
        let EngineState::Ready(table) = &self.state else {
            return SearchResponse::no_data();
        };

        let filtered = filter::apply_filters(table, query);
        let matched = filtered.len();
        let unique = dedup::deduplicate(filtered, table.columns());
        let out = materialize(unique, table.columns(), shape);
        debug!(
            ?shape,
            matched,
            unique = out.summary.total_matches,
            returned = out.summary.returned,
            "query complete"
        );

        SearchResponse {
            availability: Availability::Ready,
            summary_text: summary_text(&out.summary, shape),
            table: out.table,
            summary: out.summary,
            chart: out.chart,
        }
    }
}
