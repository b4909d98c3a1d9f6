//! Filter pipeline. Each predicate is independent; a predicate whose column the table
//! lacks passes every row.

use crate::data::normalize::{normalize_city, normalize_state};
use crate::data::record::{Column, EmployerRecord};
use crate::data::table::EmployerTable;
use crate::search::query::{OrgCategory, SearchQuery, YearFilter};

/// A requested `"City, ST"` entry split into the parts rows are compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CityState {
    city: String,
    state: String,
}

/// Entries without a `", "` separator cannot name a city and are ignored.
fn parse_city_entries(entries: &[String]) -> Vec<CityState> {
    entries
        .iter()
        .filter_map(|entry| entry.rsplit_once(", "))
        .map(|(city, state)| CityState {
            city: city.trim().to_string(),
            state: state.trim().to_string(),
        })
        .collect()
}

/// Compiled form of a query: lower-cased needles and parsed city pairs, each `None`
/// when the predicate does not apply to this table.
struct Pipeline<'q> {
    name_needle: Option<String>,
    states: Option<&'q [String]>,
    cities: Option<Vec<CityState>>,
    keywords: Option<Vec<&'static str>>,
    cap_exempt_only: bool,
    min_score: Option<f64>,
    min_approval: Option<f64>,
    year: YearFilter,
}

impl<'q> Pipeline<'q> {
    fn compile(table: &EmployerTable, query: &'q SearchQuery) -> Self {
        let name_needle =
            (!query.name_substring.is_empty()).then(|| query.name_substring.to_lowercase());

        let states = (!query.states.is_empty()).then_some(query.states.as_slice());

        let cities = if query.cities.is_empty() || !table.has_column(Column::City) {
            None
        } else {
            Some(parse_city_entries(&query.cities)).filter(|parsed| !parsed.is_empty())
        };

        let keywords = if query.categories.is_empty() || !table.has_column(Column::Classifications)
        {
            None
        } else {
            Some(
                query
                    .categories
                    .iter()
                    .flat_map(OrgCategory::keywords)
                    .copied()
                    .collect(),
            )
        };

        Self {
            name_needle,
            states,
            cities,
            keywords,
            cap_exempt_only: query.cap_exempt_only && table.has_column(Column::LikelyCapExempt),
            min_score: table
                .has_column(Column::CapExemptScore)
                .then_some(query.min_cap_exempt_score),
            min_approval: table
                .has_column(Column::ApprovalRate)
                .then_some(query.min_approval_rate),
            year: query.year,
        }
    }

    fn matches(&self, record: &EmployerRecord) -> bool {
        if let Some(needle) = &self.name_needle {
            if !record.employer_name.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(states) = self.states {
            if !states.iter().any(|s| s == &record.state) {
                return false;
            }
        }
        if let Some(cities) = &self.cities {
            let Some(city) = record.city.as_deref() else {
                return false;
            };
            let city = normalize_city(city);
            let state = normalize_state(&record.state);
            if !cities.iter().any(|cs| cs.city == city && cs.state == state) {
                return false;
            }
        }
        if let Some(keywords) = &self.keywords {
            let classifications = record
                .classifications
                .as_deref()
                .unwrap_or_default()
                .to_lowercase();
            if !keywords.iter().any(|k| classifications.contains(k)) {
                return false;
            }
        }
        if self.cap_exempt_only && record.likely_cap_exempt != Some(true) {
            return false;
        }
        if !meets_threshold(record.cap_exempt_score, self.min_score) {
            return false;
        }
        if !meets_threshold(record.approval_rate, self.min_approval) {
            return false;
        }
        self.year.matches(record.data_year)
    }
}

/// A missing value never meets an active threshold.
fn meets_threshold(value: Option<f64>, threshold: Option<f64>) -> bool {
    match threshold {
        None => true,
        Some(min) => value.is_some_and(|v| v >= min),
    }
}

/// Rows of `table` satisfying every applicable predicate, in table order.
pub fn apply_filters<'t>(table: &'t EmployerTable, query: &SearchQuery) -> Vec<&'t EmployerRecord> {
    let pipeline = Pipeline::compile(table, query);
    table
        .records()
        .iter()
        .filter(|record| pipeline.matches(record))
        .collect()
}
