use tracing::{debug, error, info, instrument, warn};

use crate::betpool::resync::config::DEFAULT_BATCH_SIZE;
use crate::betpool::resync::dedup::dedup_by_key;
use crate::betpool::resync::error::ResyncError;
use crate::betpool::resync::io::backend::TableBackend;
use crate::betpool::resync::io::sheets::SheetSource;
use crate::betpool::resync::model::{Record, Row, TableSpec};
use crate::betpool::resync::normalize::normalize_rows;

/// Result of syncing one table. Failures are values here, never panics or
/// propagated errors, so sibling tables are unaffected.
#[derive(Debug)]
pub enum TableOutcome {
    /// Every batch was accepted.
    Synced { records: usize, batches: usize },
    /// The sheet had no rows; the backend was not touched.
    EmptySheet,
    /// The read or a batch failed. Batches before the failing one stay
    /// committed.
    Failed {
        error: ResyncError,
        committed_batches: usize,
    },
}

/// Pushes one sheet into its backend table in fixed-size upsert batches.
#[derive(Debug, Clone, Copy)]
pub struct TableSynchronizer {
    batch_size: usize,
}

impl Default for TableSynchronizer {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl TableSynchronizer {
    /// A zero batch size is raised to one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Syncs the sheet behind `spec` into its backend table.
    #[instrument(
        level = "info",
        skip_all,
        fields(sheet = spec.sheet, table = spec.table, primary_key = spec.primary_key)
    )]
    pub fn sync_table<S, B>(&self, sheets: &S, backend: &mut B, spec: &TableSpec) -> TableOutcome
    where
        S: SheetSource + ?Sized,
        B: TableBackend + ?Sized,
    {
        let rows = match sheets.list_rows(spec.sheet) {
            Ok(rows) => rows,
            Err(err) => {
                error!(error = %err, "failed to read sheet");
                return TableOutcome::Failed {
                    error: table_error(spec, err),
                    committed_batches: 0,
                };
            }
        };

        if rows.is_empty() {
            warn!("sheet is empty, table left untouched");
            return TableOutcome::EmptySheet;
        }

        let records = dedup_by_key(normalize_rows(&rows), spec.primary_key);
        info!(
            row_count = rows.len(),
            record_count = records.len(),
            "records prepared"
        );

        self.push_records(backend, spec, &records)
    }

    /// Upserts already prepared records batch by batch, stopping at the first
    /// rejected batch.
    pub fn push_records<B>(&self, backend: &mut B, spec: &TableSpec, records: &[Record]) -> TableOutcome
    where
        B: TableBackend + ?Sized,
    {
        let mut committed_batches = 0;
        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let batch: Vec<Row> = chunk.iter().map(Record::to_row).collect();
            if let Err(err) = backend.upsert(spec.table, &batch, spec.primary_key) {
                error!(batch = index + 1, error = %err, "batch upsert failed");
                return TableOutcome::Failed {
                    error: table_error(spec, err),
                    committed_batches,
                };
            }
            committed_batches += 1;
            debug!(batch = index + 1, size = batch.len(), "batch committed");
        }

        info!(
            record_count = records.len(),
            batch_count = committed_batches,
            "table synced"
        );
        TableOutcome::Synced {
            records: records.len(),
            batches: committed_batches,
        }
    }
}

/// Wraps a collaborator failure as a table-scoped sync error.
fn table_error(spec: &TableSpec, err: ResyncError) -> ResyncError {
    match err {
        ResyncError::TableSync { .. } => err,
        other => ResyncError::TableSync {
            table: spec.table.to_string(),
            message: other.to_string(),
        },
    }
}

