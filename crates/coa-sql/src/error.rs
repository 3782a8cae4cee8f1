//! Error types for coa-sql

use thiserror::Error;

/// SQL text-layer errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// CSV referenced by a directive does not exist (S001)
    #[error("[S001] CSV file not found: {path}")]
    CsvNotFound { path: String },

    /// CSV could not be read (S002)
    #[error("[S002] Failed to read CSV '{path}': {message}")]
    CsvParse { path: String, message: String },

    /// CSV has no header row (S003)
    #[error("[S003] CSV file has no header row: {path}")]
    EmptyCsv { path: String },

    /// Chunk size for INSERT statements must be positive (S004)
    #[error("[S004] Rows per INSERT chunk must be greater than zero")]
    InvalidChunkSize,
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
