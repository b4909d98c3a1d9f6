//! Query tuple accepted by the engine, plus the organization-category keyword table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::record::DataYear;

pub const DEFAULT_MIN_CAP_EXEMPT_SCORE: f64 = 0.6;
pub const DEFAULT_MIN_APPROVAL_RATE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown year '{0}' (expected All, 2024 or 2025)")]
    UnknownYear(String),
    #[error("unknown organization category '{0}'")]
    UnknownCategory(String),
}

impl QueryError {
    /// Request field the offending value came from.
    pub fn field(&self) -> &'static str {
        match self {
            Self::UnknownYear(_) => "year",
            Self::UnknownCategory(_) => "categories",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum YearFilter {
    #[default]
    All,
    Year(DataYear),
}

impl YearFilter {
    pub fn matches(&self, year: DataYear) -> bool {
        match self {
            Self::All => true,
            Self::Year(wanted) => *wanted == year,
        }
    }
}

impl FromStr for YearFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("all years")
        {
            return Ok(Self::All);
        }
        trimmed
            .parse::<DataYear>()
            .map(Self::Year)
            .map_err(|_| QueryError::UnknownYear(trimmed.to_string()))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Year(year) => write!(f, "{year}"),
        }
    }
}

/// User-facing organization categories. Each maps to raw keyword substrings matched
/// case-insensitively against the `classifications` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OrgCategory {
    UniversitiesAndColleges,
    HospitalsAndMedicalCenters,
    ResearchOrganizations,
    GovernmentAgencies,
    EducationalInstitutions,
    HealthcareSystems,
    ProfessionalServices,
    NonprofitOrganizations,
}

impl OrgCategory {
    pub const ALL: [OrgCategory; 8] = [
        Self::UniversitiesAndColleges,
        Self::HospitalsAndMedicalCenters,
        Self::ResearchOrganizations,
        Self::GovernmentAgencies,
        Self::EducationalInstitutions,
        Self::HealthcareSystems,
        Self::ProfessionalServices,
        Self::NonprofitOrganizations,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::UniversitiesAndColleges => "Universities & Colleges",
            Self::HospitalsAndMedicalCenters => "Hospitals & Medical Centers",
            Self::ResearchOrganizations => "Research Organizations",
            Self::GovernmentAgencies => "Government Agencies",
            Self::EducationalInstitutions => "Educational Institutions",
            Self::HealthcareSystems => "Healthcare Systems",
            Self::ProfessionalServices => "Professional Services",
            Self::NonprofitOrganizations => "Non-profit Organizations",
        }
    }

    /// Lower-case keywords; a classification containing any of them matches.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::UniversitiesAndColleges => &["university", "education"],
            Self::HospitalsAndMedicalCenters => &["hospital"],
            Self::ResearchOrganizations => &["research_org", "research"],
            Self::GovernmentAgencies => &["government"],
            Self::EducationalInstitutions => &["education", "university"],
            Self::HealthcareSystems => &["healthcare", "hospital"],
            Self::ProfessionalServices => &["professional_services"],
            Self::NonprofitOrganizations => &["nonprofit"],
        }
    }
}

impl fmt::Display for OrgCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrgCategory {
    type Err = QueryError;

    /// Labels match case-insensitively; a decorative prefix such as an emoji is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s
            .trim()
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .trim();
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.label().eq_ignore_ascii_case(cleaned))
            .ok_or_else(|| QueryError::UnknownCategory(s.trim().to_string()))
    }
}

/// Filter criteria. Empty collections and an empty name mean "no constraint".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    pub name_substring: String,
    pub states: Vec<String>,
    /// `"City, ST"` entries.
    pub cities: Vec<String>,
    pub categories: Vec<OrgCategory>,
    pub min_cap_exempt_score: f64,
    pub min_approval_rate: f64,
    pub cap_exempt_only: bool,
    pub year: YearFilter,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            name_substring: String::new(),
            states: Vec::new(),
            cities: Vec::new(),
            categories: Vec::new(),
            min_cap_exempt_score: DEFAULT_MIN_CAP_EXEMPT_SCORE,
            min_approval_rate: DEFAULT_MIN_APPROVAL_RATE,
            cap_exempt_only: true,
            year: YearFilter::All,
        }
    }
}

/// Wire form of a query (JSON body, CLI flags). Every field is optional and defaults
/// to the engine defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(alias = "name_substring", alias = "search_text")]
    pub name: String,
    pub states: Vec<String>,
    pub cities: Vec<String>,
    #[serde(alias = "classification_labels", alias = "classifications")]
    pub categories: Vec<String>,
    #[serde(alias = "min_score")]
    pub min_cap_exempt_score: f64,
    #[serde(alias = "min_approval")]
    pub min_approval_rate: f64,
    #[serde(alias = "only_cap_exempt")]
    pub cap_exempt_only: bool,
    pub year: String,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            states: Vec::new(),
            cities: Vec::new(),
            categories: Vec::new(),
            min_cap_exempt_score: DEFAULT_MIN_CAP_EXEMPT_SCORE,
            min_approval_rate: DEFAULT_MIN_APPROVAL_RATE,
            cap_exempt_only: true,
            year: "All".to_string(),
        }
    }
}

impl SearchRequest {
    /// Validate labels and year, collecting every problem rather than stopping at the first.
    pub fn into_query(self) -> Result<SearchQuery, Vec<QueryError>> {
        let mut errors = Vec::new();

        let mut categories = Vec::new();
        for label in &self.categories {
            match label.parse::<OrgCategory>() {
                Ok(category) if !categories.contains(&category) => categories.push(category),
                Ok(_) => {}
                Err(err) => errors.push(err),
            }
        }
        let year = match self.year.parse::<YearFilter>() {
            Ok(year) => year,
            Err(err) => {
                errors.push(err);
                YearFilter::All
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(SearchQuery {
            name_substring: self.name,
            states: self.states,
            cities: self.cities,
            categories,
            min_cap_exempt_score: self.min_cap_exempt_score,
            min_approval_rate: self.min_approval_rate,
            cap_exempt_only: self.cap_exempt_only,
            year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let query = SearchQuery::default();
        assert_eq!(query.min_cap_exempt_score, 0.6);
        assert_eq!(query.min_approval_rate, 0.7);
        assert!(query.cap_exempt_only);
        assert_eq!(query.year, YearFilter::All);
        let from_empty_request = SearchRequest::default().into_query().expect("defaults are valid");
        assert_eq!(from_empty_request, query);
    }

    #[test]
    fn year_filter_accepts_all_spellings() {
        assert_eq!("All".parse::<YearFilter>(), Ok(YearFilter::All));
        assert_eq!("All Years".parse::<YearFilter>(), Ok(YearFilter::All));
        assert_eq!("2025".parse::<YearFilter>(), Ok(YearFilter::Year(DataYear::Y2025)));
        assert_eq!(
            "1999".parse::<YearFilter>(),
            Err(QueryError::UnknownYear("1999".to_string()))
        );
    }

    #[test]
    fn category_labels_tolerate_emoji_prefix_and_case() {
        assert_eq!(
            "Government Agencies".parse::<OrgCategory>(),
            Ok(OrgCategory::GovernmentAgencies)
        );
        assert_eq!(
            "🏛️ Government Agencies".parse::<OrgCategory>(),
            Ok(OrgCategory::GovernmentAgencies)
        );
        assert_eq!(
            "non-profit organizations".parse::<OrgCategory>(),
            Ok(OrgCategory::NonprofitOrganizations)
        );
        assert!("Tech Startups".parse::<OrgCategory>().is_err());
    }

    #[test]
    fn request_collects_all_validation_errors() {
        let request = SearchRequest {
            categories: vec!["Bogus".to_string(), "Hospitals & Medical Centers".to_string()],
            year: "2030".to_string(),
            ..SearchRequest::default()
        };
        let errors = request.into_query().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field(), "categories");
        assert_eq!(errors[1].field(), "year");
    }

    #[test]
    fn every_category_has_keywords() {
        for category in OrgCategory::ALL {
            assert!(!category.keywords().is_empty(), "{category} has no keywords");
        }
    }
}
