//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::result::ResultSet;
use crate::traits::{returns_rows, Database};
use async_trait::async_trait;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Column header prefix of index columns written by dataframe tools
const UNNAMED_PREFIX: &str = "Unnamed:";

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Run a row-returning statement and collect every cell as a string.
    ///
    /// DuckDB panics on `stmt.column_count()` before execution, so rows are
    /// collected first and column metadata read afterwards.
    fn query_sync(&self, sql: &str) -> DbResult<ResultSet> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;

        let rows: Vec<Vec<Option<String>>> = stmt
            .query_map([], |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count).map(|i| cell_as_string(row, i)).collect())
            })
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::ExecutionError(format!("row error: {}", e)))?;

        let columns: Vec<String> = (0..stmt.column_count())
            .map(|i| stmt.column_name(i).map_or("?".to_string(), |v| v.to_string()))
            .collect();

        Ok(ResultSet::new(columns, rows))
    }

    /// Check if relation exists synchronously
    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        let (schema, table) = split_qualified(name);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            [schema.unwrap_or("main"), table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn append_csv_sync(&self, table: &str, path: &Path) -> DbResult<usize> {
        let columns = loadable_columns(path)?;
        if columns.is_empty() {
            return Err(DbError::CsvError(format!(
                "{}: no loadable columns",
                path.display()
            )));
        }
        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let source = format!(
            "read_csv_auto('{}', header = true)",
            path.display().to_string().replace('\'', "''")
        );

        let (schema, _) = split_qualified(table);
        if let Some(schema) = schema {
            self.execute_sync(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))?;
        }
        if !self.relation_exists_sync(table)? {
            log::info!("creating table {} from {}", table, path.display());
            self.execute_sync(&format!(
                "CREATE TABLE {} AS SELECT {} FROM {} WHERE false",
                table, column_list, source
            ))?;
        }
        self.execute_sync(&format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            table, column_list, column_list, source
        ))
    }
}

/// Read a column value as a string, trying multiple DuckDB types.
///
/// DuckDB integer columns return `None` for `Option<String>`, so we try
/// String -> i64 -> f64 -> bool; anything left is NULL.
fn cell_as_string(row: &duckdb::Row<'_>, idx: usize) -> Option<String> {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return Some(s);
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return Some(n.to_string());
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return Some(f.to_string());
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return Some(b.to_string());
    }
    None
}

fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rfind('.') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Header columns of a CSV, without `Unnamed:` index columns
fn loadable_columns(path: &Path) -> DbResult<Vec<String>> {
    if !path.is_file() {
        return Err(DbError::CsvError(format!("file not found: {}", path.display())));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let columns = reader
        .headers()?
        .iter()
        .filter(|h| !h.starts_with(UNNAMED_PREFIX))
        .map(str::to_string)
        .collect();
    Ok(columns)
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn run(&self, sql: &str) -> DbResult<ResultSet> {
        if returns_rows(sql) {
            self.query_sync(sql)
        } else {
            self.execute_sync(sql)?;
            Ok(ResultSet::empty())
        }
    }

    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    async fn append_csv(&self, table: &str, path: &Path) -> DbResult<usize> {
        self.append_csv_sync(table, path)
    }

    async fn call_procedure(&self, procedure: &str) -> DbResult<()> {
        let call = if procedure.contains('(') {
            format!("CALL {}", procedure)
        } else {
            format!("CALL {}()", procedure)
        };
        let conn = self.lock()?;
        conn.execute_batch(&call).map_err(|e| DbError::CallError {
            procedure: procedure.to_string(),
            message: e.to_string(),
        })
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
