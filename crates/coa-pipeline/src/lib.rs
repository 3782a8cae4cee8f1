//! coa-pipeline - Collection phases for the COA collector
//!
//! Each phase takes an explicit [`RunContext`]:
//! fetch pulls the fileset catalog and SQL from a content host, stage builds
//! the SQL store and applies overrides, prepare expands templates into the
//! run area, execute runs them against every source system and writes
//! results plus upload manifests, and upload loads those results into the
//! reporting database.

pub mod archive;
pub mod context;
pub mod error;
pub mod execute;
pub mod fetch;
pub mod prepare;
pub mod stage;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_utils;

pub use archive::archive;
pub use context::RunContext;
pub use error::{PipelineError, PipelineResult};
pub use execute::{execute, ExecuteSummary};
pub use fetch::{fetch, ContentHost, FetchSummary, LocalContentHost};
pub use prepare::{
    prepare, PostExecute, PrepareSummary, PreparedFile, PreparedStatement, Preparer,
};
pub use stage::{stage, StageSummary};
pub use upload::{upload, upload_folder, UploadSummary};
