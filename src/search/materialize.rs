//! Display shaping: final sort, preview bound, column selection, rounding, summary and
//! per-state chart counts.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::data::record::{Column, ColumnSet, EmployerRecord, DISPLAY_COLUMNS};

pub const PREVIEW_LIMIT: usize = 100;
pub const CHART_GROUP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// Name ascending then petitions descending, first [PREVIEW_LIMIT] rows, with chart.
    Bounded,
    /// Name ascending, every row.
    Unbounded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Float(f64),
    Integer(i64),
    Empty,
}

impl Cell {
    /// Rendering used by delimited exports and the CLI table view.
    pub fn to_field(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Float(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    /// Unique employers after deduplication.
    pub total_matches: usize,
    pub returned: usize,
    /// Distinct states among the returned rows only.
    pub states_in_results: usize,
    pub years_in_results: Vec<String>,
    pub deduplicated: bool,
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCount {
    pub state: String,
    pub count: usize,
}

/// Horizontal bar chart data: returned rows per state, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub title: String,
    pub bars: Vec<StateCount>,
}

#[derive(Debug, Clone)]
pub struct Materialized {
    pub table: ResultTable,
    pub summary: ResultSummary,
    pub chart: Option<ChartData>,
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn display_cell(record: &EmployerRecord, column: Column) -> Cell {
    match column {
        Column::EmployerName => Cell::Text(record.employer_name.clone()),
        Column::City => record.city.clone().map_or(Cell::Empty, Cell::Text),
        Column::State => Cell::Text(record.state.clone()),
        Column::CapExemptScore => record
            .cap_exempt_score
            .map_or(Cell::Empty, |v| Cell::Float(round3(v))),
        Column::ApprovalRate => record
            .approval_rate
            .map_or(Cell::Empty, |v| Cell::Float(round3(v))),
        Column::TotalPetitions => record.total_petitions.map_or(Cell::Empty, Cell::Integer),
        Column::DataYear => Cell::Text(record.data_year.to_string()),
        Column::Classifications => record.classifications.clone().map_or(Cell::Empty, Cell::Text),
        Column::LikelyCapExempt => record
            .likely_cap_exempt
            .map_or(Cell::Empty, |v| Cell::Text(v.to_string())),
    }
}

fn petitions_desc(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn sort_for_display(rows: &mut [&EmployerRecord], shape: OutputShape, columns: &ColumnSet) {
    let by_petitions = shape == OutputShape::Bounded && columns.contains(Column::TotalPetitions);
    rows.sort_by(|a, b| {
        let by_name = a.employer_name.cmp(&b.employer_name);
        if by_petitions {
            by_name.then_with(|| petitions_desc(a.total_petitions, b.total_petitions))
        } else {
            by_name
        }
    });
}

/// Top states by row count; equal counts keep first-appearance order.
fn state_chart(rows: &[&EmployerRecord]) -> Option<ChartData> {
    if rows.is_empty() {
        return None;
    }
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in rows {
        let count = counts.entry(record.state.as_str()).or_insert_with(|| {
            order.push(record.state.as_str());
            0
        });
        *count += 1;
    }
    let mut bars: Vec<StateCount> = order
        .into_iter()
        .map(|state| StateCount {
            state: state.to_string(),
            count: counts.get(state).copied().unwrap_or_default(),
        })
        .collect();
    bars.sort_by(|a, b| b.count.cmp(&a.count));
    bars.truncate(CHART_GROUP_LIMIT);

    Some(ChartData {
        title: format!("Top 10 States/Territories ({} employers)", rows.len()),
        bars,
    })
}

/// Shape deduplicated rows for display. `columns` is the loaded table's column set.
pub fn materialize(
    mut rows: Vec<&EmployerRecord>,
    columns: &ColumnSet,
    shape: OutputShape,
) -> Materialized {
    let total_matches = rows.len();
    sort_for_display(&mut rows, shape, columns);
    if shape == OutputShape::Bounded {
        rows.truncate(PREVIEW_LIMIT);
    }

    let display: Vec<Column> = DISPLAY_COLUMNS
        .iter()
        .copied()
        .filter(|c| columns.contains(*c))
        .collect();
    let table = ResultTable {
        columns: display.iter().map(Column::display_name).collect(),
        rows: rows
            .iter()
            .map(|record| display.iter().map(|c| display_cell(record, *c)).collect())
            .collect(),
    };

    let summary = ResultSummary {
        total_matches,
        returned: rows.len(),
        states_in_results: rows.iter().map(|r| r.state.as_str()).collect::<BTreeSet<_>>().len(),
        years_in_results: rows
            .iter()
            .map(|r| r.data_year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|y| y.to_string())
            .collect(),
        deduplicated: true,
        truncated: rows.len() < total_matches,
    };

    let chart = match shape {
        OutputShape::Bounded => state_chart(&rows),
        OutputShape::Unbounded => None,
    };

    Materialized {
        table,
        summary,
        chart,
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Markdown summary shown above the result table.
pub fn summary_text(summary: &ResultSummary, shape: OutputShape) -> String {
    let total = group_thousands(summary.total_matches);
    let mut text = String::from("## Search Results\n\n");
    text.push_str(&format!(
        "**Found {total} unique employers matching your criteria**\n\n"
    ));
    match shape {
        OutputShape::Bounded => {
            let suffix = if summary.truncated { " (top matches)" } else { "" };
            text.push_str(&format!(
                "- **Displaying:** {} of {total} results{suffix}\n",
                group_thousands(summary.returned)
            ));
        }
        OutputShape::Unbounded => {
            text.push_str(&format!("- **Returned:** all {total} results\n"));
        }
    }
    text.push_str(&format!(
        "- **States/Territories:** {} (in displayed results)\n",
        summary.states_in_results
    ));
    let years = if summary.years_in_results.is_empty() {
        "none".to_string()
    } else {
        summary.years_in_results.join(", ")
    };
    text.push_str(&format!("- **Data Year:** {years}\n"));
    text.push_str("- **Auto-deduplicated:** best record kept per employer\n");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::DataYear;

    fn record(name: &str, state: &str, petitions: Option<i64>) -> EmployerRecord {
        EmployerRecord {
            total_petitions: petitions,
            cap_exempt_score: Some(0.87654),
            ..EmployerRecord::new(name, state, DataYear::Y2024)
        }
    }

    fn full_columns() -> ColumnSet {
        DISPLAY_COLUMNS.into_iter().collect()
    }

    #[test]
    fn preview_sorts_by_name_then_petitions_descending() {
        let rows = [
            record("Beta", "CA", Some(1)),
            record("Alpha", "NY", Some(2)),
            record("Alpha", "CA", Some(9)),
            record("Alpha", "TX", None),
        ];
        let out = materialize(rows.iter().collect(), &full_columns(), OutputShape::Bounded);
        let states: Vec<&Cell> = out.table.rows.iter().map(|r| &r[2]).collect();
        assert_eq!(
            states,
            vec![
                &Cell::Text("CA".into()),
                &Cell::Text("NY".into()),
                &Cell::Text("TX".into()),
                &Cell::Text("CA".into()),
            ]
        );
    }

    #[test]
    fn preview_is_bounded_and_full_is_not() {
        let rows: Vec<EmployerRecord> = (0..150)
            .map(|i| record(&format!("Employer {i:03}"), "CA", Some(i)))
            .collect();
        let preview = materialize(rows.iter().collect(), &full_columns(), OutputShape::Bounded);
        let full = materialize(rows.iter().collect(), &full_columns(), OutputShape::Unbounded);
        assert_eq!(preview.table.len(), PREVIEW_LIMIT);
        assert!(preview.summary.truncated);
        assert_eq!(preview.summary.total_matches, 150);
        assert_eq!(full.table.len(), 150);
        assert!(full.chart.is_none());
    }

    #[test]
    fn only_present_columns_are_displayed_and_scores_rounded() {
        let columns: ColumnSet = [Column::CapExemptScore].into_iter().collect();
        let columns = {
            let mut c = columns;
            for required in crate::data::record::REQUIRED_COLUMNS {
                c.insert(required);
            }
            c
        };
        let rows = [record("Acme", "CA", Some(3))];
        let out = materialize(rows.iter().collect(), &columns, OutputShape::Unbounded);
        assert_eq!(
            out.table.columns,
            vec!["Employer Name", "State", "Cap-Exempt Score", "Year"]
        );
        assert_eq!(out.table.rows[0][2], Cell::Float(0.877));
    }

    #[test]
    fn chart_counts_states_in_returned_rows() {
        let rows = [
            record("A", "MA", None),
            record("B", "CA", None),
            record("C", "CA", None),
            record("D", "MA", None),
            record("E", "NY", None),
        ];
        let out = materialize(rows.iter().collect(), &full_columns(), OutputShape::Bounded);
        let chart = out.chart.expect("chart for non-empty preview");
        assert_eq!(chart.title, "Top 10 States/Territories (5 employers)");
        assert_eq!(chart.bars[0], StateCount { state: "MA".into(), count: 2 });
        assert_eq!(chart.bars[1], StateCount { state: "CA".into(), count: 2 });
        assert_eq!(out.summary.states_in_results, 3);
    }

    #[test]
    fn chart_keeps_ten_largest_states() {
        let states = ["AA", "BB", "CC", "DD", "EE", "FF", "GG", "HH", "II", "JJ", "KK", "LL"];
        let rows: Vec<EmployerRecord> = states
            .iter()
            .enumerate()
            .flat_map(|(i, state)| {
                (0..=i).map(move |n| record(&format!("{state} employer {n}"), state, None))
            })
            .collect();
        let out = materialize(rows.iter().collect(), &full_columns(), OutputShape::Bounded);
        let chart = out.chart.expect("chart for non-empty preview");

        assert_eq!(chart.bars.len(), CHART_GROUP_LIMIT);
        assert!(chart.bars.windows(2).all(|pair| pair[0].count > pair[1].count));
        assert_eq!(chart.bars[0], StateCount { state: "LL".into(), count: 12 });
        assert_eq!(chart.bars[9], StateCount { state: "CC".into(), count: 3 });
        assert!(!chart.bars.iter().any(|bar| bar.state == "AA" || bar.state == "BB"));
        assert_eq!(out.summary.states_in_results, 12);
    }

    #[test]
    fn empty_result_has_zero_summary_and_no_chart() {
        let out = materialize(Vec::new(), &full_columns(), OutputShape::Bounded);
        assert!(out.chart.is_none());
        let text = summary_text(&out.summary, OutputShape::Bounded);
        assert!(text.contains("Found 0 unique employers"));
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
