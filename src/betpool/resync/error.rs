use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ResyncError>;

/// Error type covering the different failure cases that can occur while the
/// spreadsheet is read, normalised, or pushed into the backend.
#[derive(Debug, Error)]
pub enum ResyncError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Transport-level failures raised by the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when a client handle cannot be constructed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Raised when the logical truncation of a table fails.
    #[error("failed to truncate table {table}: {message}")]
    Truncation { table: String, message: String },

    /// Raised when the identity records cannot be parsed or written.
    #[error("identity rebuild failed: {0}")]
    IdentityRebuild(String),

    /// Raised when reading or writing a single table fails.
    #[error("sync of table {table} failed: {message}")]
    TableSync { table: String, message: String },

    /// Raised when the backend answers with a non-success status.
    #[error("backend rejected request on {table} with status {status}: {body}")]
    Backend {
        table: String,
        status: u16,
        body: String,
    },

    /// Raised when a sheet does not follow the expected conventions.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a requested sheet is absent from the workbook.
    #[error("missing sheet '{0}'")]
    MissingSheet(String),

    /// Raised when run options are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Failure classes surfaced to the operator in a run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Truncation,
    IdentityRebuild,
    TableSync,
}

impl ResyncError {
    /// Maps the error onto the failure class the orchestrator reports.
    ///
    /// Errors that are not tied to a specific phase are attributed to the
    /// table sync that issued them.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResyncError::Connection(_)
            | ResyncError::InvalidConfig(_)
            | ResyncError::MissingInput(_)
            | ResyncError::Logging(_) => ErrorKind::Connection,
            ResyncError::Truncation { .. } => ErrorKind::Truncation,
            ResyncError::IdentityRebuild(_) => ErrorKind::IdentityRebuild,
            _ => ErrorKind::TableSync,
        }
    }
}
