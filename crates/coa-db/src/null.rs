//! Null backend: emulates a connection when database access is disabled

use crate::error::DbResult;
use crate::result::ResultSet;
use crate::traits::Database;
use async_trait::async_trait;
use std::path::Path;

/// Accepts every statement and returns no rows
#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Database for NullBackend {
    async fn run(&self, sql: &str) -> DbResult<ResultSet> {
        log::debug!("(emulated) {}", sql.lines().next().unwrap_or_default());
        Ok(ResultSet::empty())
    }

    async fn execute(&self, _sql: &str) -> DbResult<usize> {
        Ok(0)
    }

    async fn relation_exists(&self, _name: &str) -> DbResult<bool> {
        Ok(false)
    }

    async fn append_csv(&self, table: &str, path: &Path) -> DbResult<usize> {
        log::info!("(emulated) append {} to {}", path.display(), table);
        Ok(0)
    }

    async fn call_procedure(&self, procedure: &str) -> DbResult<()> {
        log::info!("(emulated) call {}", procedure);
        Ok(())
    }

    fn db_type(&self) -> &'static str {
        "null"
    }
}
