//! Collapse rows naming the same employer to the best-ranked one.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::data::normalize::normalize_employer_key;
use crate::data::record::{Column, ColumnSet, EmployerRecord};

/// Priority components, most significant first. Only those present in the table's
/// column set take part in the ranking.
const PRIORITY: [Column; 3] = [
    Column::CapExemptScore,
    Column::ApprovalRate,
    Column::TotalPetitions,
];

/// Descending with missing values after every present value.
fn desc_missing_last<T: PartialOrd>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_priority(a: &EmployerRecord, b: &EmployerRecord, keys: &[Column]) -> Ordering {
    keys.iter()
        .map(|column| match column {
            Column::CapExemptScore => desc_missing_last(a.cap_exempt_score, b.cap_exempt_score),
            Column::ApprovalRate => desc_missing_last(a.approval_rate, b.approval_rate),
            Column::TotalPetitions => desc_missing_last(a.total_petitions, b.total_petitions),
            _ => Ordering::Equal,
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// One row per normalized employer key: the row with the greatest priority tuple, the
/// earliest one on ties. Output is in priority order.
pub fn deduplicate<'t>(
    mut rows: Vec<&'t EmployerRecord>,
    columns: &ColumnSet,
) -> Vec<&'t EmployerRecord> {
    let keys: Vec<Column> = PRIORITY
        .iter()
        .copied()
        .filter(|c| columns.contains(*c))
        .collect();
    if !keys.is_empty() {
        rows.sort_by(|a, b| compare_priority(a, b, &keys));
    }

    let mut seen = HashSet::with_capacity(rows.len());
    rows.retain(|record| seen.insert(normalize_employer_key(&record.employer_name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::DataYear;

    fn scored(name: &str, score: Option<f64>, petitions: Option<i64>) -> EmployerRecord {
        EmployerRecord {
            cap_exempt_score: score,
            total_petitions: petitions,
            ..EmployerRecord::new(name, "CA", DataYear::Y2024)
        }
    }

    fn all_priority_columns() -> ColumnSet {
        PRIORITY.into_iter().collect()
    }

    #[test]
    fn keeps_highest_score_per_normalized_name() {
        let rows = [
            scored("ACME UNIVERSITY!!", Some(0.5), None),
            scored("Acme University", Some(0.9), None),
        ];
        let kept = deduplicate(rows.iter().collect(), &all_priority_columns());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].cap_exempt_score, Some(0.9));
    }

    #[test]
    fn exact_ties_keep_the_first_row() {
        let rows = [
            scored("Acme", Some(0.7), Some(3)),
            scored("ACME", Some(0.7), Some(3)),
        ];
        let kept = deduplicate(rows.iter().collect(), &all_priority_columns());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].employer_name, "Acme");
    }

    #[test]
    fn later_components_break_earlier_ties() {
        let rows = [
            scored("Acme", Some(0.7), Some(3)),
            scored("acme", Some(0.7), Some(40)),
        ];
        let kept = deduplicate(rows.iter().collect(), &all_priority_columns());
        assert_eq!(kept[0].total_petitions, Some(40));
    }

    #[test]
    fn missing_values_rank_below_present_ones() {
        let rows = [scored("Acme", None, None), scored("acme.", Some(0.1), None)];
        let kept = deduplicate(rows.iter().collect(), &all_priority_columns());
        assert_eq!(kept[0].cap_exempt_score, Some(0.1));
    }

    #[test]
    fn absent_columns_are_left_out_of_the_ranking() {
        let rows = [
            scored("Acme", Some(0.2), Some(1)),
            scored("ACME", Some(0.9), Some(50)),
        ];
        let kept = deduplicate(rows.iter().collect(), &ColumnSet::new());
        assert_eq!(kept[0].cap_exempt_score, Some(0.2));
    }

    #[test]
    fn deduplication_is_idempotent() {
        let rows = [
            scored("Acme", Some(0.2), Some(1)),
            scored("Globex", Some(0.4), None),
            scored("ACME", Some(0.9), Some(50)),
            scored("globex", Some(0.4), Some(2)),
        ];
        let columns = all_priority_columns();
        let once = deduplicate(rows.iter().collect(), &columns);
        let twice = deduplicate(once.clone(), &columns);
        assert_eq!(once, twice);
    }
}
