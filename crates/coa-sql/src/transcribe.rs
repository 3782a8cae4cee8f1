//! CSV to volatile-table transcription
//!
//! A CSV file becomes one `CREATE MULTISET VOLATILE TABLE` statement and a
//! series of INSERT statements, each a `UNION ALL` chain of literal
//! `SELECT`s covering at most `chunk_rows` rows. The table is session scoped,
//! keeps its rows across commits, and has no primary index.

use crate::csv_table::CsvTable;
use crate::error::{SqlError, SqlResult};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Extra characters added to the longest value of a text column
pub const TEXT_HEADROOM: usize = 100;

/// Rows per INSERT statement unless configured otherwise
pub const DEFAULT_CHUNK_ROWS: usize = 100;

/// Inferred type of a CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every cell present and a 64-bit integer
    Integer,
    /// Every present cell a finite number, at least one present
    Float,
    /// Anything else; carries the declared length
    Text(usize),
}

impl ColumnType {
    /// Classify a column from its cells
    pub fn infer<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> Self {
        let mut rows = 0usize;
        let mut present = 0usize;
        let mut all_int = true;
        let mut all_float = true;
        let mut max_len = 0usize;

        for cell in cells {
            rows += 1;
            let Some(value) = cell else {
                all_int = false;
                continue;
            };
            present += 1;
            max_len = max_len.max(value.chars().count());
            if value.parse::<i64>().is_err() {
                all_int = false;
            }
            if !value.parse::<f64>().is_ok_and(f64::is_finite) {
                all_float = false;
            }
        }

        if rows > 0 && all_int {
            ColumnType::Integer
        } else if present > 0 && all_float {
            ColumnType::Float
        } else {
            ColumnType::Text(max_len + TEXT_HEADROOM)
        }
    }

    /// Type used in the CREATE statement
    pub fn ddl(&self) -> String {
        match self {
            ColumnType::Integer => "BIGINT".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Text(n) => format!("VARCHAR({}) CHARACTER SET UNICODE", n),
        }
    }

    /// Type used when casting literals in the INSERT statements
    pub fn cast_type(&self) -> String {
        match self {
            ColumnType::Integer => "BIGINT".to_string(),
            ColumnType::Float => "FLOAT".to_string(),
            ColumnType::Text(n) => format!("VARCHAR({})", n),
        }
    }

    /// SQL literal for one cell
    pub fn literal(&self, cell: Option<&str>) -> String {
        match (self, cell) {
            (_, None) => "NULL".to_string(),
            (ColumnType::Text(_), Some(v)) => format!("'{}'", v.replace('\'', "''")),
            (_, Some(v)) => v.to_string(),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ddl())
    }
}

/// Replace every run of non-alphanumeric characters with `_`
pub fn sanitize_column(name: &str) -> String {
    static NON_ALNUM: OnceLock<regex::Regex> = OnceLock::new();
    NON_ALNUM
        .get_or_init(|| regex::Regex::new(r"[^0-9A-Za-z]+").expect("valid regex literal"))
        .replace_all(name, "_")
        .into_owned()
}

/// A CSV file ready to be written out as volatile-table SQL
#[derive(Debug, Clone)]
pub struct VolatileTable {
    /// Table name (the CSV file's basename), unquoted
    pub name: String,
    /// Sanitised column names with their types
    pub columns: Vec<(String, ColumnType)>,
    table: CsvTable,
}

impl VolatileTable {
    /// Type every column of `table`
    pub fn new(name: impl Into<String>, table: CsvTable) -> Self {
        let columns = table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| (sanitize_column(h), ColumnType::infer(table.column(i))))
            .collect();
        Self {
            name: name.into(),
            columns,
            table,
        }
    }

    /// Read `path` and name the table after its basename
    pub fn from_csv(path: &Path) -> SqlResult<Self> {
        let table = CsvTable::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, table))
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    fn quoted_name(&self) -> String {
        format!("\"{}\"", self.name.replace('"', "\"\""))
    }

    /// The CREATE statement, terminated with `\n;`
    pub fn create_statement(&self) -> String {
        let mut sql = format!("CREATE MULTISET VOLATILE TABLE {}\n", self.quoted_name());
        for (i, (column, ty)) in self.columns.iter().enumerate() {
            let delim = if i == 0 { '(' } else { ',' };
            sql.push_str(&format!("{}{:<30} {}\n", delim, format!("\"{}\"", column), ty.ddl()));
        }
        sql.push_str(") NO PRIMARY INDEX\nON COMMIT PRESERVE ROWS\n;");
        sql
    }

    /// One INSERT per chunk of `chunk_rows` rows, each terminated with `\n;`
    pub fn insert_statements(&self, chunk_rows: usize) -> SqlResult<Vec<String>> {
        if chunk_rows == 0 {
            return Err(SqlError::InvalidChunkSize);
        }
        let mut out = Vec::new();
        for (chunk_index, chunk) in self.table.rows.chunks(chunk_rows).enumerate() {
            let first_row = chunk_index * chunk_rows;
            let selects: Vec<String> = chunk
                .iter()
                .enumerate()
                .map(|(offset, row)| self.select_row(row, first_row + offset))
                .collect();
            out.push(format!(
                "INSERT INTO {}\n{}\n;",
                self.quoted_name(),
                selects.join("    UNION ALL\n")
            ));
        }
        Ok(out)
    }

    fn select_row(&self, row: &[Option<String>], index: usize) -> String {
        let mut sql = String::from("SELECT\n");
        for (i, (_, ty)) in self.columns.iter().enumerate() {
            let delim = if i == 0 { "  " } else { " ," };
            let cell = row.get(i).and_then(|v| v.as_deref());
            sql.push_str(&format!(
                "{}cast({} as {})\n",
                delim,
                ty.literal(cell),
                ty.cast_type()
            ));
        }
        sql.push_str(&format!("from (sel 1 one) i{}", index));
        sql
    }

    /// CREATE followed by every INSERT
    pub fn statements(&self, chunk_rows: usize) -> SqlResult<Vec<String>> {
        let mut out = vec![self.create_statement()];
        out.extend(self.insert_statements(chunk_rows)?);
        Ok(out)
    }
}

/// Transcribe the CSV at `path` into volatile-table statements
pub fn transcribe(path: &Path, chunk_rows: usize) -> SqlResult<Vec<String>> {
    let table = VolatileTable::from_csv(path)?;
    log::info!(
        "    transcribing {} ({} rows, {} per chunk)",
        table.name,
        table.row_count(),
        chunk_rows
    );
    table.statements(chunk_rows)
}

#[cfg(test)]
#[path = "transcribe_test.rs"]
mod tests;
