use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::data::registry::LoadedSource;
use crate::search::export::ExportError;
use crate::search::query::{QueryError, SearchQuery, SearchRequest};
use crate::search::{Availability, SearchEngine};

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationErrorResponse {
    /// Group query errors by the request field they came from.
    pub fn from_query_errors(errors: Vec<QueryError>) -> Self {
        let mut by_field: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for err in errors {
            by_field.entry(err.field()).or_default().push(err.to_string());
        }
        Self {
            status: "error",
            message: "Validation failed",
            errors: by_field
                .into_iter()
                .map(|(field, messages)| ValidationIssue { field, messages })
                .collect(),
        }
    }
}

#[derive(Debug)]
pub enum QueryPayloadError {
    Parse(serde_json::Error),
    Validation(ValidationErrorResponse),
    Encode(serde_json::Error),
}

impl fmt::Display for QueryPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Validation(_) => write!(f, "invalid search request"),
            Self::Encode(err) => write!(f, "failed to encode response: {err}"),
        }
    }
}

impl std::error::Error for QueryPayloadError {}

#[derive(Debug)]
pub enum ExportPayloadError {
    Query(QueryPayloadError),
    Export(ExportError),
}

impl fmt::Display for ExportPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ExportPayloadError {}

/// An empty body means "all defaults".
pub fn parse_query(body: &str) -> Result<SearchQuery, QueryPayloadError> {
    let request: SearchRequest = if body.trim().is_empty() {
        SearchRequest::default()
    } else {
        serde_json::from_str(body).map_err(QueryPayloadError::Parse)?
    };
    request.into_query().map_err(|errors| {
        QueryPayloadError::Validation(ValidationErrorResponse::from_query_errors(errors))
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    records: usize,
    sources: &'a [LoadedSource],
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

pub fn health_payload(engine: &SearchEngine) -> Result<String, serde_json::Error> {
    let table = engine.table();
    let payload = HealthResponse {
        status: match engine.availability() {
            Availability::Ready => "ok",
            Availability::NoData => "no_data",
        },
        service: "capexempt-api",
        version: env!("CARGO_PKG_VERSION"),
        records: table.map_or(0, |t| t.len()),
        sources: table.map(|t| t.sources()).unwrap_or_default(),
        reason: engine.unavailable_reason(),
    };
    serde_json::to_string_pretty(&payload)
}

pub fn facets_payload(engine: &SearchEngine) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&engine.facets())
}

pub fn search_payload(engine: &SearchEngine, body: &str) -> Result<String, QueryPayloadError> {
    let query = parse_query(body)?;
    serde_json::to_string_pretty(&engine.search(&query)).map_err(QueryPayloadError::Encode)
}

pub fn results_payload(engine: &SearchEngine, body: &str) -> Result<String, QueryPayloadError> {
    let query = parse_query(body)?;
    serde_json::to_string_pretty(&engine.full_results(&query)).map_err(QueryPayloadError::Encode)
}

/// CSV text of the full result set.
pub fn export_payload(engine: &SearchEngine, body: &str) -> Result<String, ExportPayloadError> {
    let query = parse_query(body).map_err(ExportPayloadError::Query)?;
    let bytes = engine.export(&query).map_err(ExportPayloadError::Export)?;
    String::from_utf8(bytes).map_err(|err| {
        ExportPayloadError::Export(ExportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err,
        )))
    })
}
