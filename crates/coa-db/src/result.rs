//! Tabular statement results

use crate::error::{DbError, DbResult};
use std::path::Path;

/// Column names plus rows of optional string cells (`None` is SQL NULL)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// A result with no rows
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write as comma-separated UTF-8 with a header row; NULL is written
    /// as an empty field.
    pub fn write_csv(&self, path: &Path) -> DbResult<()> {
        let mut writer = csv::Writer::from_path(path)
            .map_err(|e| DbError::CsvError(format!("{}: {}", path.display(), e)))?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer
            .flush()
            .map_err(|e| DbError::CsvError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}
