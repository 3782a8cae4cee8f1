//! Error types for coa-pipeline

use coa_core::CoreError;
use coa_db::DbError;
use coa_sql::SqlError;
use thiserror::Error;

/// Pipeline phase errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Sql(#[from] SqlError),

    #[error(transparent)]
    Db(#[from] DbError),

    /// P001: A template could not be prepared
    #[error("[P001] Failed to prepare '{file}': {source}")]
    PrepareFailed {
        file: String,
        #[source]
        source: Box<PipelineError>,
    },

    /// P002: `file` directives nested too deeply (or including themselves)
    #[error("[P002] File includes nested deeper than {limit} levels at '{path}'")]
    IncludeDepthExceeded { path: String, limit: usize },

    /// P003: Content host location not supported
    #[error("[P003] Unsupported content host '{location}': only local folders and file:// URLs can be fetched")]
    UnsupportedContentHost { location: String },

    /// P004: Fetching from the content host failed
    #[error("[P004] Failed to fetch '{remote}' from {host}: {message}")]
    FetchFailed {
        host: String,
        remote: String,
        message: String,
    },

    /// P005: Statement execution failed on a source system
    #[error("[P005] {system}/{fileset}: statement {seq} of '{file}' failed: {source}")]
    StatementFailed {
        system: String,
        fileset: String,
        file: String,
        seq: usize,
        #[source]
        source: DbError,
    },

    /// P006: One or more systems failed during execution
    #[error("[P006] Execution failed on {count} system(s): {systems}")]
    SystemsFailed { count: usize, systems: String },

    /// P007: Upload of a manifest entry failed
    #[error("[P007] Upload of '{file}' into {table} failed: {source}")]
    UploadFailed {
        file: String,
        table: String,
        #[source]
        source: DbError,
    },

    /// P008: Manifest references a file that is not there
    #[error("[P008] Manifest entry file not found: {path}")]
    ManifestFileMissing { path: String },
}

/// Result type alias for PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;
