//! Filter options offered to callers, derived from the loaded table.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::data::normalize::{is_zip_like, normalize_city, normalize_city_state};
use crate::data::record::Column;
use crate::data::table::EmployerTable;
use crate::search::query::OrgCategory;

/// Raw classification tokens offered for browsing.
const CLASSIFICATION_FACET_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Facets {
    pub states: Vec<String>,
    pub cities: Vec<String>,
    pub classifications: Vec<String>,
    pub categories: Vec<&'static str>,
    pub years: Vec<String>,
}

pub fn derive_facets(table: &EmployerTable) -> Facets {
    Facets {
        states: distinct_states(table),
        cities: derive_city_list(table),
        classifications: distinct_classifications(table),
        categories: OrgCategory::ALL.iter().map(OrgCategory::label).collect(),
        years: table.years().iter().map(|y| y.to_string()).collect(),
    }
}

fn distinct_states(table: &EmployerTable) -> Vec<String> {
    table
        .records()
        .iter()
        .map(|r| r.state.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted, deduplicated "City, ST" entries. ZIP codes misfiled as cities are left out.
pub fn derive_city_list(table: &EmployerTable) -> Vec<String> {
    if !table.has_column(Column::City) {
        return Vec::new();
    }
    table
        .records()
        .iter()
        .filter_map(|r| {
            let city = r.city.as_deref()?;
            if city.trim().is_empty() || r.state.trim().is_empty() {
                return None;
            }
            if is_zip_like(&normalize_city(city)) {
                return None;
            }
            Some(normalize_city_state(city, &r.state))
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn distinct_classifications(table: &EmployerTable) -> Vec<String> {
    if !table.has_column(Column::Classifications) {
        return Vec::new();
    }
    table
        .records()
        .iter()
        .filter_map(|r| r.classifications.as_deref())
        .flat_map(|c| c.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(CLASSIFICATION_FACET_LIMIT)
        .collect()
}
