//! Full destructive rebuild of the backend from the spreadsheet.
//!
//! A run walks `Idle → Truncating → RebuildingIdentity → RebuildingCore →
//! Done`. A failed delete moves it to `Aborted` before anything is rebuilt,
//! which can leave the backend partially truncated; re-running is the
//! recovery path. The identity table is never truncated, only upserted.

use serde_json::Value;
use tracing::{error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::betpool::resync::config::ResyncOptions;
use crate::betpool::resync::dedup::{dedup_by, dedup_by_key};
use crate::betpool::resync::error::{ErrorKind, Result, ResyncError};
use crate::betpool::resync::io::backend::{DeleteFilter, TableBackend};
use crate::betpool::resync::io::sheets::SheetSource;
use crate::betpool::resync::model::{
    BALANCE_FIELD, CONFIG, CONFIG_VALUE_COLUMN, CellValue, REBUILD_ORDER, Row, TRUNCATE_ORDER,
    USERS_CONFLICT_KEY, USERS_TABLE,
};
use crate::betpool::resync::normalize::normalize_rows;
use crate::betpool::resync::report::{Phase, ReportEntry, RunReport};
use crate::betpool::resync::table_sync::{TableOutcome, TableSynchronizer};

/// Connects both collaborators and runs a full resync.
///
/// `connect` is called exactly once. When it fails the run aborts before any
/// destructive call; the clients it returns are dropped when the run ends.
pub fn run_full_resync<S, B, C>(connect: C, options: ResyncOptions) -> RunReport
where
    S: SheetSource,
    B: TableBackend,
    C: FnOnce() -> Result<(S, B)>,
{
    let mut state = RunState::new();
    state.advance(Phase::Connecting);
    match connect() {
        Ok((sheets, backend)) => Orchestrator::new(sheets, backend, options).run_with(state),
        Err(err) => {
            let err = match err.kind() {
                ErrorKind::Connection => err,
                _ => ResyncError::Connection(err.to_string()),
            };
            error!(run_id = %state.report.run_id, error = %err, "failed to connect");
            state.fail(ReportEntry::error(Phase::Connecting, None, &err));
            state.finish()
        }
    }
}

/// Transient bookkeeping of one run.
#[derive(Debug)]
struct RunState {
    phase: Phase,
    report: RunReport,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            report: RunReport::new(Uuid::new_v4()),
        }
    }

    fn advance(&mut self, phase: Phase) {
        info!(run_id = %self.report.run_id, from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
    }

    fn record(&mut self, entry: ReportEntry) {
        self.report.push(entry);
    }

    fn fail(&mut self, entry: ReportEntry) {
        self.record(entry);
        self.advance(Phase::Aborted);
    }

    fn finish(mut self) -> RunReport {
        self.report.final_phase = self.phase;
        self.report
    }
}

/// Sequences truncation and rebuild across the fixed table set.
#[derive(Debug)]
pub struct Orchestrator<S, B> {
    sheets: S,
    backend: B,
    options: ResyncOptions,
    synchronizer: TableSynchronizer,
}

impl<S, B> Orchestrator<S, B>
where
    S: SheetSource,
    B: TableBackend,
{
    pub fn new(sheets: S, backend: B, options: ResyncOptions) -> Self {
        let synchronizer = TableSynchronizer::new(options.batch_size);
        Self {
            sheets,
            backend,
            options,
            synchronizer,
        }
    }

    /// Runs every phase and returns the report. Never panics on collaborator
    /// failures; each one becomes a report entry.
    pub fn run(self) -> RunReport {
        self.run_with(RunState::new())
    }

    fn run_with(mut self, mut state: RunState) -> RunReport {
        let span = info_span!("resync", run_id = %state.report.run_id);
        let _guard = span.enter();

        state.advance(Phase::Truncating);
        if let Err(entry) = self.truncate(&mut state) {
            state.fail(entry);
            return state.finish();
        }

        state.advance(Phase::RebuildingIdentity);
        self.rebuild_identity(&mut state);

        state.advance(Phase::RebuildingCore);
        self.rebuild_core(&mut state);

        state.advance(Phase::Done);
        state.finish()
    }

    /// Wipes dependent tables, children before parents. Stops at the first
    /// failed delete.
    #[instrument(level = "info", skip_all)]
    fn truncate(&mut self, state: &mut RunState) -> std::result::Result<(), ReportEntry> {
        for spec in TRUNCATE_ORDER {
            let filter = DeleteFilter::not_null(spec.primary_key);
            match self.backend.delete_where(spec.table, &filter) {
                Ok(()) => {
                    info!(table = spec.table, "table truncated");
                    state.record(ReportEntry::ok(
                        Phase::Truncating,
                        Some(spec.table),
                        "all rows deleted",
                    ));
                }
                Err(err) => {
                    let err = ResyncError::Truncation {
                        table: spec.table.to_string(),
                        message: err.to_string(),
                    };
                    error!(table = spec.table, error = %err, "truncation failed, aborting run");
                    return Err(ReportEntry::error(Phase::Truncating, Some(spec.table), &err));
                }
            }
        }
        Ok(())
    }

    /// Upserts the identity records found in the config sheet. Failure is
    /// reported as a warning and never stops the run.
    #[instrument(level = "info", skip_all)]
    fn rebuild_identity(&mut self, state: &mut RunState) {
        let entry = match self.try_rebuild_identity() {
            Ok(Some(count)) => {
                info!(user_count = count, "identity records upserted");
                ReportEntry::ok(
                    Phase::RebuildingIdentity,
                    Some(USERS_TABLE),
                    format!("{count} users upserted with balance reset"),
                )
            }
            Ok(None) => {
                warn!(key = %self.options.users_key, "no identity entry in config sheet");
                ReportEntry::warning(
                    Phase::RebuildingIdentity,
                    Some(USERS_TABLE),
                    format!(
                        "config sheet has no '{}' entry; users left unchanged",
                        self.options.users_key
                    ),
                )
            }
            Err(err) => {
                warn!(error = %err, "identity rebuild failed, continuing");
                let mut entry =
                    ReportEntry::warning(Phase::RebuildingIdentity, Some(USERS_TABLE), err.to_string());
                entry.error_kind = Some(err.kind());
                entry
            }
        };
        state.record(entry);
    }

    fn try_rebuild_identity(&mut self) -> Result<Option<usize>> {
        let rows = self
            .sheets
            .list_rows(CONFIG.sheet)
            .map_err(|err| ResyncError::IdentityRebuild(err.to_string()))?;
        let records = dedup_by_key(normalize_rows(&rows), CONFIG.primary_key);
        let Some(record) = records
            .iter()
            .find(|record| record.key(CONFIG.primary_key).as_deref() == Some(self.options.users_key.as_str()))
        else {
            return Ok(None);
        };

        let users = parse_users(record.get(CONFIG_VALUE_COLUMN), &self.options.users_key)?;
        for batch in users.chunks(self.synchronizer.batch_size()) {
            self.backend
                .upsert(USERS_TABLE, batch, USERS_CONFLICT_KEY)
                .map_err(|err| ResyncError::IdentityRebuild(err.to_string()))?;
        }
        Ok(Some(users.len()))
    }

    /// Rebuilds each table, parents before children. A failed table is
    /// reported and its siblings are still attempted.
    #[instrument(level = "info", skip_all)]
    fn rebuild_core(&mut self, state: &mut RunState) {
        for spec in REBUILD_ORDER {
            let entry = match self.synchronizer.sync_table(&self.sheets, &mut self.backend, &spec) {
                TableOutcome::Synced { records, batches } => ReportEntry::ok(
                    Phase::RebuildingCore,
                    Some(spec.table),
                    format!("{records} records upserted in {batches} batches"),
                ),
                TableOutcome::EmptySheet => ReportEntry::warning(
                    Phase::RebuildingCore,
                    Some(spec.table),
                    format!("sheet '{}' is empty; table skipped", spec.sheet),
                ),
                TableOutcome::Failed {
                    error,
                    committed_batches,
                } => {
                    let mut entry = ReportEntry::error(Phase::RebuildingCore, Some(spec.table), &error);
                    entry.message = format!("{} ({committed_batches} batches committed)", entry.message);
                    entry
                }
            };
            state.record(entry);
        }
    }
}

/// Parses the identity list, resets every balance, and collapses duplicate
/// usernames (last one wins).
fn parse_users(value: Option<&CellValue>, users_key: &str) -> Result<Vec<Row>> {
    let text = match value {
        Some(CellValue::Text(text)) => text,
        Some(CellValue::Null) | None => {
            return Err(ResyncError::IdentityRebuild(format!("'{users_key}' has no value")));
        }
        Some(CellValue::Number(_)) => {
            return Err(ResyncError::IdentityRebuild(format!(
                "'{users_key}' is not a JSON list"
            )));
        }
    };

    let users: Vec<Row> = serde_json::from_str(text)
        .map_err(|err| ResyncError::IdentityRebuild(format!("'{users_key}' is not valid JSON: {err}")))?;

    let users = users
        .into_iter()
        .enumerate()
        .map(|(index, mut user)| {
            match user.get(USERS_CONFLICT_KEY) {
                Some(Value::String(name)) if !name.trim().is_empty() => {}
                _ => {
                    return Err(ResyncError::IdentityRebuild(format!(
                        "user at position {index} has no {USERS_CONFLICT_KEY}"
                    )));
                }
            }
            user.insert(BALANCE_FIELD.to_string(), Value::from(0));
            Ok(user)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(dedup_by(users, |user| {
        user.get(USERS_CONFLICT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
    }))
}
