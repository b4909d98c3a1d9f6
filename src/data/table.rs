//! Startup-loaded employer table. Built once, shared read-only (via `Arc`) by every query.

use std::collections::BTreeSet;

use crate::data::record::{Column, ColumnSet, DataYear, EmployerRecord};
use crate::data::registry::{LoadedSource, Registry};

/// Immutable in-memory table. Queries borrow it and build their own working copies.
#[derive(Debug, Clone, Default)]
pub struct EmployerTable {
    records: Vec<EmployerRecord>,
    columns: ColumnSet,
    sources: Registry,
}

impl EmployerTable {
    /// Table from already-parsed records. `columns` declares which optional columns
    /// the data carries; required columns are always added.
    pub fn from_records(records: Vec<EmployerRecord>, mut columns: ColumnSet) -> Self {
        for column in crate::data::record::REQUIRED_COLUMNS {
            columns.insert(column);
        }
        Self {
            records,
            columns,
            sources: Vec::new(),
        }
    }

    /// Concatenate per-source tables in order. The column set is the union of theirs.
    pub fn concat(parts: Vec<(EmployerTable, LoadedSource)>) -> Self {
        let mut table = EmployerTable::default();
        for (part, source) in parts {
            table.columns.extend(&part.columns);
            table.records.extend(part.records);
            table.sources.push(source);
        }
        table
    }

    pub fn records(&self) -> &[EmployerRecord] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(column)
    }

    pub fn sources(&self) -> &[LoadedSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct provenance years present, ascending.
    pub fn years(&self) -> Vec<DataYear> {
        self.records
            .iter()
            .map(|r| r.data_year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
