//! Database trait definition and driver factory

use crate::duckdb::DuckDbBackend;
use crate::error::DbResult;
use crate::null::NullBackend;
use crate::result::ResultSet;
use crate::teradata::TeradataBackend;
use async_trait::async_trait;
use coa_core::{ConnectionSpec, DriverKind};
use std::path::Path;

/// Database abstraction trait for the collector
///
/// One value is one connection. Implementations must be Send + Sync for
/// async operation; statements on one connection are always awaited
/// serially.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run one statement and return its tabular result.
    ///
    /// Statements that produce no rows (DDL, DML) return an empty result.
    async fn run(&self, sql: &str) -> DbResult<ResultSet>;

    /// Execute a statement that modifies data, returning affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Check if a table or view exists
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Append a CSV file to `table`, creating it if needed.
    ///
    /// Columns whose header starts with `Unnamed:` are not loaded. Returns
    /// the number of rows appended.
    async fn append_csv(&self, table: &str, path: &Path) -> DbResult<usize>;

    /// Call a stored procedure
    async fn call_procedure(&self, procedure: &str) -> DbResult<()>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Whether `sql` is a statement that returns rows.
///
/// Looks at the first keyword after leading comments and parentheses.
pub fn returns_rows(sql: &str) -> bool {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(end) => after[end + 2..].trim_start(),
                None => return false,
            };
        } else if let Some(after) = rest.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(end) => after[end + 1..].trim_start(),
                None => return false,
            };
        } else if let Some(after) = rest.strip_prefix('(') {
            rest = after.trim_start();
        } else {
            break;
        }
    }

    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(
        keyword.as_str(),
        "select" | "sel" | "with" | "values" | "show" | "describe" | "help" | "pragma" | "from"
            | "table" | "summarize" | "explain"
    )
}

/// Open a connection for `spec`.
///
/// With `skip_db`, no connection is made and every statement is emulated.
pub fn connect(spec: &ConnectionSpec, skip_db: bool) -> DbResult<Box<dyn Database>> {
    if skip_db {
        log::info!("database access disabled, emulating connection to {}", spec.host);
        return Ok(Box::new(NullBackend::new()));
    }

    log::info!(
        "connecting to {} host '{}' as '{}'",
        spec.driver,
        spec.host,
        spec.username
    );
    match spec.driver {
        DriverKind::DuckDb => {
            let path = if spec.host.trim().is_empty() {
                ":memory:"
            } else {
                spec.host.trim()
            };
            Ok(Box::new(DuckDbBackend::new(path)?))
        }
        DriverKind::Teradata => Ok(Box::new(TeradataBackend::connect(spec)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(driver: DriverKind, host: &str) -> ConnectionSpec {
        ConnectionSpec {
            host: host.to_string(),
            username: "svc".to_string(),
            password: "pw".to_string(),
            logmech: String::new(),
            driver,
            encryption: false,
        }
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("select 1"));
        assert!(returns_rows("  SEL * from t"));
        assert!(returns_rows("/* c */ -- x\n with a as (select 1) select * from a"));
        assert!(returns_rows("(select 1) union (select 2)"));
        assert!(!returns_rows("create table t (a int)"));
        assert!(!returns_rows("INSERT INTO t SELECT 1"));
        assert!(!returns_rows("/* {{replaceMe:temp}} */"));
        assert!(!returns_rows("selection_is_not_a_keyword"));
    }

    #[test]
    fn test_connect_skip_db_is_null_backend() {
        let db = connect(&spec(DriverKind::Teradata, "td.example.com"), true).unwrap();
        assert_eq!(db.db_type(), "null");
    }

    #[test]
    fn test_connect_duckdb_in_memory() {
        let db = connect(&spec(DriverKind::DuckDb, ""), false).unwrap();
        assert_eq!(db.db_type(), "duckdb");
    }

    #[test]
    fn test_connect_teradata_not_implemented() {
        let err = connect(&spec(DriverKind::Teradata, "td.example.com"), false)
            .err()
            .unwrap();
        assert!(matches!(err, crate::DbError::NotImplemented { .. }));
    }
}
