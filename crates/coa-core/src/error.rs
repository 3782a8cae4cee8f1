//! Error types for coa-core

use thiserror::Error;

/// Core error type for the collector
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration document not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse a configuration document
    #[error("[C002] Failed to parse {document}: {message}")]
    ConfigParseError { document: String, message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Fileset catalog is empty or missing
    #[error("[C004] Fileset catalog at '{path}' is empty. Delete it and fetch again to restore the index.")]
    EmptyFilesetCatalog { path: String },

    /// C005: Working directory missing
    #[error("[C005] Working directory not found: {path}")]
    WorkingDirNotFound { path: String },

    /// C006: Output folder for upload could not be determined
    #[error("[C006] Invalid output folder: {path}")]
    InvalidOutputFolder { path: String },

    /// C007: No last-run pointer recorded
    #[error("[C007] No last-run output folder recorded under {root}")]
    NoLastRun { root: String },

    /// C008: Save-name disambiguation ran out of suffixes
    #[error("[C008] Too many result files named like '{name}' (limit {limit})")]
    SaveNameExhausted { name: String, limit: u32 },

    /// C009: IO error
    #[error("[C009] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C010: IO error with file path context
    #[error("[C010] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C011: YAML parse error
    #[error("[C011] YAML error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("[C012] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap an IO error with the path that caused it
    pub fn io_at(path: &std::path::Path, source: std::io::Error) -> Self {
        CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
