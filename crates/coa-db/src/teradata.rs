//! Teradata backend stub
//!
//! Placeholder for a native Teradata driver; every operation reports
//! not-implemented. Use the DuckDB driver or `skip_db` until one exists.

use crate::error::{DbError, DbResult};
use crate::result::ResultSet;
use crate::traits::Database;
use async_trait::async_trait;
use coa_core::ConnectionSpec;
use std::path::Path;

/// Teradata database backend (stub implementation)
pub struct TeradataBackend {}

fn not_implemented(feature: &str) -> DbError {
    DbError::NotImplemented {
        backend: "teradata".to_string(),
        feature: feature.to_string(),
    }
}

impl TeradataBackend {
    /// Connect to a Teradata system (not yet implemented)
    pub fn connect(spec: &ConnectionSpec) -> DbResult<Self> {
        log::warn!("no native Teradata driver available for host '{}'", spec.host);
        Err(not_implemented("connect"))
    }
}

#[async_trait]
impl Database for TeradataBackend {
    async fn run(&self, _sql: &str) -> DbResult<ResultSet> {
        Err(not_implemented("run"))
    }

    async fn execute(&self, _sql: &str) -> DbResult<usize> {
        Err(not_implemented("execute"))
    }

    async fn relation_exists(&self, _name: &str) -> DbResult<bool> {
        Err(not_implemented("relation_exists"))
    }

    async fn append_csv(&self, _table: &str, _path: &Path) -> DbResult<usize> {
        Err(not_implemented("append_csv"))
    }

    async fn call_procedure(&self, _procedure: &str) -> DbResult<()> {
        Err(not_implemented("call_procedure"))
    }

    fn db_type(&self) -> &'static str {
        "teradata"
    }
}
