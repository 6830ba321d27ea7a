//! In-memory collaborators. `MemoryBackend` powers `--dry-run`; both types
//! double as fakes in the integration tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::betpool::resync::error::{Result, ResyncError};
use crate::betpool::resync::io::backend::{DeleteFilter, TableBackend};
use crate::betpool::resync::io::sheets::SheetSource;
use crate::betpool::resync::model::{RawRow, Row};

/// Sheets held in memory, keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct MemorySheets {
    sheets: HashMap<String, Vec<RawRow>>,
    failing: HashSet<String>,
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        self.sheets.insert(name.into(), rows);
        self
    }

    /// Makes every read of `name` fail.
    pub fn fail_reads_for(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }
}

impl SheetSource for MemorySheets {
    fn list_rows(&self, sheet: &str) -> Result<Vec<RawRow>> {
        if self.failing.contains(sheet) {
            return Err(ResyncError::TableSync {
                table: sheet.to_string(),
                message: "sheet read failed".to_string(),
            });
        }
        self.sheets
            .get(sheet)
            .cloned()
            .ok_or_else(|| ResyncError::MissingSheet(sheet.to_string()))
    }
}

/// Operation recorded by [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Delete,
    Upsert,
}

/// One call received by the backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCall {
    pub operation: Operation,
    pub table: String,
    pub row_count: usize,
}

/// Backend that keeps its tables in memory.
///
/// Rows are keyed by their conflict-column value, so an upsert replaces
/// the existing row with the same key and replaying a batch is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: BTreeMap<String, Vec<Row>>,
    calls: Vec<BackendCall>,
    failures: HashSet<(Operation, String)>,
    upsert_budget: HashMap<String, usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a table.
    pub fn with_table(mut self, table: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.insert(table.into(), rows);
        self
    }

    /// Makes every `operation` on `table` fail.
    pub fn fail_on(mut self, operation: Operation, table: impl Into<String>) -> Self {
        self.failures.insert((operation, table.into()));
        self
    }

    /// Lets the first `successes` upserts on `table` through and fails the rest.
    pub fn fail_upserts_after(mut self, table: impl Into<String>, successes: usize) -> Self {
        self.upsert_budget.insert(table.into(), successes);
        self
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tables(&self) -> &BTreeMap<String, Vec<Row>> {
        &self.tables
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    fn record(&mut self, operation: Operation, table: &str, row_count: usize) {
        self.calls.push(BackendCall {
            operation,
            table: table.to_string(),
            row_count,
        });
    }

    fn rejection(table: &str, operation: Operation) -> ResyncError {
        ResyncError::Backend {
            table: table.to_string(),
            status: 500,
            body: format!("injected {operation:?} failure"),
        }
    }
}

impl TableBackend for MemoryBackend {
    fn delete_where(&mut self, table: &str, filter: &DeleteFilter) -> Result<()> {
        self.record(Operation::Delete, table, 0);
        if self.failures.contains(&(Operation::Delete, table.to_string())) {
            return Err(Self::rejection(table, Operation::Delete));
        }
        if let Some(rows) = self.tables.get_mut(table) {
            rows.retain(|row| !filter.matches(row));
        }
        Ok(())
    }

    fn upsert(&mut self, table: &str, rows: &[Row], conflict_key: &str) -> Result<()> {
        self.record(Operation::Upsert, table, rows.len());
        if self.failures.contains(&(Operation::Upsert, table.to_string())) {
            return Err(Self::rejection(table, Operation::Upsert));
        }
        if let Some(remaining) = self.upsert_budget.get_mut(table) {
            if *remaining == 0 {
                return Err(Self::rejection(table, Operation::Upsert));
            }
            *remaining -= 1;
        }

        if let Some(row) = rows.iter().find(|row| conflict_value(row, conflict_key).is_none()) {
            return Err(ResyncError::Backend {
                table: table.to_string(),
                status: 400,
                body: format!("row without conflict key '{conflict_key}': {}", Value::Object(row.clone())),
            });
        }

        let stored = self.tables.entry(table.to_string()).or_default();
        for row in rows {
            let key = conflict_value(row, conflict_key);
            match stored
                .iter_mut()
                .find(|existing| conflict_value(existing, conflict_key) == key)
            {
                Some(existing) => {
                    for (column, value) in row {
                        existing.insert(column.clone(), value.clone());
                    }
                }
                None => stored.push(row.clone()),
            }
        }
        Ok(())
    }
}

fn conflict_value<'a>(row: &'a Row, conflict_key: &str) -> Option<&'a Value> {
    row.get(conflict_key).filter(|value| !value.is_null())
}
