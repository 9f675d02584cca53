use std::path::PathBuf;

/// Errors that stop the whole run
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    /// input workbook is missing
    #[error("{} not found.", .0.display())]
    InputNotFound(PathBuf),
    /// file read failure
    #[error("failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),
    /// workbook could not be opened or parsed
    #[error("illegal workbook {}: {reason}", .path.display())]
    IllegalWorkbook { path: PathBuf, reason: String },
    /// csv error
    #[error("failed to parse csv: {0}")]
    CsvParseError(#[from] csv::Error),
    /// could not connect to the database
    #[error("database connection failed: {0}")]
    ConnectError(#[source] sqlx::Error),
    /// statement failure outside the per-row loop
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    /// the url scheme is neither sqlite nor mysql
    #[error("unsupported database url: {0}")]
    UnsupportedDatabase(String),
    /// a requested sheet has no record kind behind it
    #[error("unknown sheet '{0}', expected 'faculty' or 'students'")]
    UnknownSheet(String),
    /// logger setup failed
    #[error("failed to initialize logger: {0}")]
    LoggerError(#[from] log::SetLoggerError),
    /// report serialization
    #[error("failed to serialize report: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Why a single row was skipped.
///
/// `Display` is the operator-facing message collected into the report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("{kind} row {index}: {field} is required.")]
    MissingKey {
        kind: &'static str,
        index: usize,
        field: &'static str,
    },
    #[error("{kind} row {index}: {field} must be {min}-{max} (got: {got}).")]
    OutOfRange {
        kind: &'static str,
        index: usize,
        field: &'static str,
        min: i64,
        max: i64,
        got: String,
    },
    #[error("{kind} row {index}: email must end with {domain} (got: {got}).")]
    EmailDomain {
        kind: &'static str,
        index: usize,
        domain: String,
        got: String,
    },
    #[error("{kind} row {index}: DB error -> {message}")]
    Database {
        kind: &'static str,
        index: usize,
        message: String,
    },
}
