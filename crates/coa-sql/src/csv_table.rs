//! In-memory CSV table used by `temp` and `loop` directives

use crate::error::{SqlError, SqlResult};
use std::path::Path;

/// A whole CSV file: trimmed headers plus rows of optional cells.
///
/// Empty cells are `None`. Short rows are padded with `None`; extra cells
/// beyond the header are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl CsvTable {
    /// Read a CSV file with a header row
    pub fn read(path: &Path) -> SqlResult<Self> {
        if !path.is_file() {
            return Err(SqlError::CsvNotFound {
                path: path.display().to_string(),
            });
        }
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;
        Self::from_reader(reader, path)
    }

    /// Parse CSV text; `origin` is only used in error messages
    pub fn parse(text: &str, origin: &Path) -> SqlResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        Self::from_reader(reader, origin)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>, origin: &Path) -> SqlResult<Self> {
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(origin, e))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(SqlError::EmptyCsv {
                path: origin.display().to_string(),
            });
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| csv_error(origin, e))?;
            let row = (0..headers.len())
                .map(|i| record.get(i).filter(|v| !v.is_empty()).map(str::to_string))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of column `index`, top to bottom
    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|v| v.as_deref()))
    }

    /// `(header, value)` pairs of one row, empty cells as `""`
    pub fn row_pairs(&self, row: usize) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .zip(&self.rows[row])
            .map(|(h, v)| (h.as_str(), v.as_deref().unwrap_or("")))
            .collect()
    }
}

fn csv_error(path: &Path, err: csv::Error) -> SqlError {
    SqlError::CsvParse {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_with_empty_and_short_rows() {
        let table = CsvTable::parse("id, name \n1,Alice\n2,\n3\n", Path::new("t.csv")).unwrap();
        assert_eq!(table.headers, vec!["id", "name"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.rows[1], vec![Some("2".to_string()), None]);
        assert_eq!(table.rows[2], vec![Some("3".to_string()), None]);
    }

    #[test]
    fn test_row_pairs() {
        let table = CsvTable::parse("id,name\n1,Alice\n", Path::new("t.csv")).unwrap();
        assert_eq!(table.row_pairs(0), vec![("id", "1"), ("name", "Alice")]);
    }

    #[test]
    fn test_column_values() {
        let table = CsvTable::parse("a,b\n1,x\n,y\n", Path::new("t.csv")).unwrap();
        let col: Vec<Option<&str>> = table.column(0).collect();
        assert_eq!(col, vec![Some("1"), None]);
    }

    #[test]
    fn test_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = CsvTable::read(&tmp.path().join("ghost.csv")).unwrap_err();
        assert!(matches!(err, SqlError::CsvNotFound { .. }));
    }

    #[test]
    fn test_empty_file_has_no_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        let err = CsvTable::read(&path).unwrap_err();
        assert!(matches!(err, SqlError::EmptyCsv { .. }));
    }
}
