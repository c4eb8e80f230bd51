use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryEngineError {
    #[error("SQL execution failed: {error}")]
    Execution { error: String },
    #[error("Malformed query: {message}")]
    MalformedQuery { message: String },
    #[error("Column `{column}` missing from result row")]
    MissingColumn { column: String },
    #[error("Cursor already closed")]
    CursorClosed,
    #[error("Failed to release connection: {error}")]
    ConnectionRelease { error: String },
}
