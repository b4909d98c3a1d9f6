//! Employer record model and the column vocabulary shared by loader, filters and display.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Provenance tag for a yearly data snapshot. Assigned at load time from the source
/// declaration, never read from the file itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum DataYear {
    #[serde(rename = "2024")]
    Y2024,
    #[serde(rename = "2025")]
    Y2025,
}

impl DataYear {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Y2024 => "2024",
            Self::Y2025 => "2025",
        }
    }
}

/// Accepts `2025` as well as `"2025"` so YAML configs need no quoting.
impl<'de> Deserialize<'de> for DataYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }
        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => number.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for DataYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataYear {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2024" => Ok(Self::Y2024),
            "2025" => Ok(Self::Y2025),
            other => Err(format!("unsupported data year '{other}'")),
        }
    }
}

/// Known columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    EmployerName,
    City,
    State,
    CapExemptScore,
    ApprovalRate,
    TotalPetitions,
    DataYear,
    Classifications,
    LikelyCapExempt,
}

/// Columns every accepted source must expose (`data_year` is stamped by the loader).
pub const REQUIRED_COLUMNS: [Column; 3] = [Column::EmployerName, Column::State, Column::DataYear];

/// Columns shown in result tables, in this fixed order.
pub const DISPLAY_COLUMNS: [Column; 7] = [
    Column::EmployerName,
    Column::City,
    Column::State,
    Column::CapExemptScore,
    Column::ApprovalRate,
    Column::TotalPetitions,
    Column::DataYear,
];

impl Column {
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::EmployerName => "employer_name",
            Self::City => "city",
            Self::State => "state",
            Self::CapExemptScore => "cap_exempt_score",
            Self::ApprovalRate => "approval_rate",
            Self::TotalPetitions => "total_petitions",
            Self::DataYear => "data_year",
            Self::Classifications => "classifications",
            Self::LikelyCapExempt => "likely_cap_exempt",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::EmployerName => "Employer Name",
            Self::City => "City",
            Self::State => "State",
            Self::CapExemptScore => "Cap-Exempt Score",
            Self::ApprovalRate => "Approval Rate",
            Self::TotalPetitions => "Total Petitions",
            Self::DataYear => "Year",
            Self::Classifications => "Classifications",
            Self::LikelyCapExempt => "Likely Cap-Exempt",
        }
    }

    /// Map a raw file header to a known column. Matching ignores case and treats
    /// spaces and hyphens as underscores, so `Employer_Name`, `employer name` and
    /// `EMPLOYER-NAME` all resolve to [Column::EmployerName].
    pub fn from_header(header: &str) -> Option<Column> {
        let key: String = header
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        match key.as_str() {
            "employer_name" => Some(Self::EmployerName),
            "city" | "employer_city" => Some(Self::City),
            "state" | "employer_state" => Some(Self::State),
            "data_year" => Some(Self::DataYear),
            "classifications" => Some(Self::Classifications),
            "cap_exempt_score" => Some(Self::CapExemptScore),
            "approval_rate" => Some(Self::ApprovalRate),
            "total_petitions" => Some(Self::TotalPetitions),
            "likely_cap_exempt" => Some(Self::LikelyCapExempt),
            _ => None,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source_name())
    }
}

/// Which columns a table (or a single source) actually carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSet(BTreeSet<Column>);

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: Column) {
        self.0.insert(column);
    }

    pub fn contains(&self, column: Column) -> bool {
        self.0.contains(&column)
    }

    pub fn extend(&mut self, other: &ColumnSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().copied()
    }

    /// Required columns this set lacks.
    pub fn missing_required(&self) -> Vec<Column> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.contains(*c))
            .collect()
    }
}

impl FromIterator<Column> for ColumnSet {
    fn from_iter<T: IntoIterator<Item = Column>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One row of the in-memory table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployerRecord {
    pub employer_name: String,
    pub city: Option<String>,
    pub state: String,
    pub data_year: DataYear,
    pub classifications: Option<String>,
    pub cap_exempt_score: Option<f64>,
    pub approval_rate: Option<f64>,
    pub total_petitions: Option<i64>,
    pub likely_cap_exempt: Option<bool>,
}

impl EmployerRecord {
    /// Minimal record with only the required fields set.
    pub fn new(
        employer_name: impl Into<String>,
        state: impl Into<String>,
        data_year: DataYear,
    ) -> Self {
        Self {
            employer_name: employer_name.into(),
            city: None,
            state: state.into(),
            data_year,
            classifications: None,
            cap_exempt_score: None,
            approval_rate: None,
            total_petitions: None,
            likely_cap_exempt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_mapping_ignores_case_and_separators() {
        assert_eq!(Column::from_header("Employer_Name"), Some(Column::EmployerName));
        assert_eq!(Column::from_header(" employer name "), Some(Column::EmployerName));
        assert_eq!(Column::from_header("CAP-EXEMPT-SCORE"), Some(Column::CapExemptScore));
        assert_eq!(Column::from_header("EMPLOYER_STATE"), Some(Column::State));
        assert_eq!(Column::from_header("Industry"), None);
    }

    #[test]
    fn missing_required_lists_absent_columns_in_order() {
        let set: ColumnSet = [Column::EmployerName, Column::City].into_iter().collect();
        assert_eq!(set.missing_required(), vec![Column::State, Column::DataYear]);
    }

    #[test]
    fn data_year_round_trips_through_str() {
        assert_eq!("2025".parse::<DataYear>(), Ok(DataYear::Y2025));
        assert_eq!(DataYear::Y2024.to_string(), "2024");
        assert!("2023".parse::<DataYear>().is_err());
    }
}
