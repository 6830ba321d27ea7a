use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::betpool::resync::error::{ErrorKind, Result, ResyncError};

/// Stage of a resync run. Runs only move forward; `Aborted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    Truncating,
    RebuildingIdentity,
    RebuildingCore,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Truncating => "truncating",
            Phase::RebuildingIdentity => "rebuilding identity",
            Phase::RebuildingCore => "rebuilding core",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            Status::Warning => f.write_str("warning"),
            Status::Error => f.write_str("error"),
        }
    }
}

/// One visible line of a run report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub phase: Phase,
    /// Table (or other target) the entry is about, if any.
    pub target: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub message: String,
}

impl ReportEntry {
    pub fn ok(phase: Phase, target: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(phase, target, Status::Ok, None, message.into())
    }

    pub fn warning(phase: Phase, target: Option<&str>, message: impl Into<String>) -> Self {
        Self::new(phase, target, Status::Warning, None, message.into())
    }

    /// Error entry carrying the failure class of `error`.
    pub fn error(phase: Phase, target: Option<&str>, error: &ResyncError) -> Self {
        Self::new(
            phase,
            target,
            Status::Error,
            Some(error.kind()),
            error.to_string(),
        )
    }

    fn new(
        phase: Phase,
        target: Option<&str>,
        status: Status,
        error_kind: Option<ErrorKind>,
        message: String,
    ) -> Self {
        Self {
            phase,
            target: target.map(str::to_string),
            status,
            error_kind,
            message,
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.phase)?;
        if let Some(target) = &self.target {
            write!(f, " {target}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Outcome of a full resync run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub final_phase: Phase,
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            final_phase: Phase::Idle,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Whether the run reached `Done` without a single error entry.
    pub fn is_success(&self) -> bool {
        self.final_phase == Phase::Done && !self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|entry| entry.status == Status::Error)
    }

    pub fn is_aborted(&self) -> bool {
        self.final_phase == Phase::Aborted
    }

    /// First entry recorded for `target` in the given phase.
    pub fn entry_for(&self, phase: Phase, target: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|entry| entry.phase == phase && entry.target.as_deref() == Some(target))
    }

    pub fn errors(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.status == Status::Error)
    }

    /// Process exit code for the run: 0 on success, 2 when tables failed,
    /// 1 when the run aborted.
    pub fn exit_code(&self) -> i32 {
        if self.is_aborted() {
            1
        } else if self.has_errors() {
            2
        } else {
            0
        }
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "resync run {} finished in phase {}", self.run_id, self.final_phase)?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
