use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::data::normalize::{is_zip_like, normalize_city, normalize_employer_key};
use crate::data::table::EmployerTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

fn out_of_unit_range(value: Option<f64>) -> Option<f64> {
    value.filter(|v| !(0.0..=1.0).contains(v))
}

/// Data-quality checks over a loaded table. Values are reported, never corrected.
pub fn validate_table(table: &EmployerTable) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut key_counts: HashMap<String, usize> = HashMap::new();
    let mut per_year: BTreeMap<String, usize> = BTreeMap::new();

    for (index, record) in table.records().iter().enumerate() {
        let context = format!("row {index} ({})", record.employer_name.trim());

        if let Some(score) = out_of_unit_range(record.cap_exempt_score) {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("cap_exempt_score {score} outside [0, 1]"),
            );
        }
        if let Some(rate) = out_of_unit_range(record.approval_rate) {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("approval_rate {rate} outside [0, 1]"),
            );
        }
        if let Some(petitions) = record.total_petitions.filter(|p| *p < 0) {
            report.push(
                ValidationSeverity::Error,
                &context,
                format!("total_petitions {petitions} is negative"),
            );
        }
        if let Some(city) = record.city.as_deref() {
            if is_zip_like(&normalize_city(city)) {
                report.push(
                    ValidationSeverity::Warning,
                    &context,
                    format!("city '{}' looks like a ZIP code", city.trim()),
                );
            }
        }

        let key = normalize_employer_key(&record.employer_name);
        if key.is_empty() {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "employer name normalizes to an empty key",
            );
        } else {
            *key_counts.entry(key).or_default() += 1;
        }
        *per_year.entry(record.data_year.to_string()).or_default() += 1;
    }

    let duplicate_groups = key_counts.values().filter(|count| **count > 1).count();
    report.push(
        ValidationSeverity::Info,
        "dataset",
        format!(
            "{duplicate_groups} employer names appear more than once and will be deduplicated"
        ),
    );
    for (year, count) in per_year {
        report.push(
            ValidationSeverity::Info,
            format!("year {year}"),
            format!("{count} records"),
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::{ColumnSet, DataYear, EmployerRecord};

    #[test]
    fn flags_out_of_range_scores_and_zip_cities() {
        let mut bad = EmployerRecord::new("Acme", "CA", DataYear::Y2024);
        bad.cap_exempt_score = Some(1.4);
        bad.city = Some("94105".to_string());
        let mut dup = EmployerRecord::new("ACME!", "CA", DataYear::Y2025);
        dup.approval_rate = Some(0.9);
        let table = EmployerTable::from_records(vec![bad, dup], ColumnSet::new());

        let report = validate_table(&table);
        assert!(report.has_errors());
        assert_eq!(report.count(ValidationSeverity::Error), 1);
        assert_eq!(report.count(ValidationSeverity::Warning), 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.message.starts_with("1 employer names appear more than once")));
    }

    #[test]
    fn clean_table_has_no_errors() {
        let mut ok = EmployerRecord::new("Acme University", "MA", DataYear::Y2024);
        ok.cap_exempt_score = Some(0.8);
        ok.approval_rate = Some(1.0);
        ok.total_petitions = Some(12);
        let table = EmployerTable::from_records(vec![ok], ColumnSet::new());
        assert!(!validate_table(&table).has_errors());
    }
}
