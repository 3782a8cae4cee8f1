use super::*;
use tempfile::TempDir;

fn infer(cells: &[Option<&str>]) -> ColumnType {
    ColumnType::infer(cells.iter().copied())
}

fn write_dates_csv(dir: &Path, rows: usize) -> std::path::PathBuf {
    let mut text = String::from("calendar date,day_num\n");
    for i in 0..rows {
        text.push_str(&format!("2024-01-{:02},{}\n", (i % 28) + 1, i));
    }
    let path = dir.join("dates.csv");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_infer_integer() {
    assert_eq!(infer(&[Some("1"), Some("-20")]), ColumnType::Integer);
}

#[test]
fn test_infer_integer_with_gap_is_float() {
    assert_eq!(infer(&[Some("1"), None]), ColumnType::Float);
}

#[test]
fn test_infer_float() {
    assert_eq!(infer(&[Some("1.5"), Some("2")]), ColumnType::Float);
}

#[test]
fn test_infer_text_length_has_headroom() {
    assert_eq!(infer(&[Some("abc"), Some("x")]), ColumnType::Text(103));
    assert_eq!(infer(&[Some("NaN")]), ColumnType::Text(103));
}

#[test]
fn test_infer_all_empty_is_text() {
    assert_eq!(infer(&[None, None]), ColumnType::Text(100));
    assert_eq!(infer(&[]), ColumnType::Text(100));
}

#[test]
fn test_literals() {
    assert_eq!(ColumnType::Integer.literal(Some("7")), "7");
    assert_eq!(ColumnType::Float.literal(None), "NULL");
    assert_eq!(ColumnType::Text(110).literal(Some("O'Brien")), "'O''Brien'");
}

#[test]
fn test_sanitize_column() {
    assert_eq!(sanitize_column("calendar date"), "calendar_date");
    assert_eq!(sanitize_column("a--b c"), "a_b_c");
}

#[test]
fn test_create_statement_shape() {
    let table = CsvTable::parse("id,full name\n1,Alice\n", Path::new("people.csv")).unwrap();
    let vt = VolatileTable::new("people.csv", table);
    let create = vt.create_statement();

    assert!(create.starts_with("CREATE MULTISET VOLATILE TABLE \"people.csv\"\n(\"id\""));
    assert!(create.contains("BIGINT"));
    assert!(create.contains(",\"full_name\""));
    assert!(create.contains("VARCHAR(105) CHARACTER SET UNICODE"));
    assert!(create.ends_with(") NO PRIMARY INDEX\nON COMMIT PRESERVE ROWS\n;"));
}

#[test]
fn test_insert_statement_shape() {
    let table = CsvTable::parse("id,name\n1,Alice\n2,\n", Path::new("p.csv")).unwrap();
    let vt = VolatileTable::new("p.csv", table);
    let inserts = vt.insert_statements(100).unwrap();

    assert_eq!(inserts.len(), 1);
    let sql = &inserts[0];
    assert!(sql.starts_with("INSERT INTO \"p.csv\"\nSELECT\n  cast(1 as BIGINT)\n ,cast('Alice' as VARCHAR(105))\n"));
    assert!(sql.contains("from (sel 1 one) i0    UNION ALL\nSELECT"));
    assert!(sql.contains(",cast(NULL as VARCHAR(105))"));
    assert!(sql.ends_with("from (sel 1 one) i1\n;"));
}

#[test]
fn test_transcribe_250_rows_in_three_chunks() {
    let tmp = TempDir::new().unwrap();
    let path = write_dates_csv(tmp.path(), 250);

    let statements = transcribe(&path, DEFAULT_CHUNK_ROWS).unwrap();
    assert_eq!(statements.len(), 4);
    assert!(statements[0].starts_with("CREATE MULTISET VOLATILE TABLE \"dates.csv\""));

    let selects: Vec<usize> = statements[1..]
        .iter()
        .map(|s| s.matches("SELECT\n").count())
        .collect();
    assert_eq!(selects, vec![100, 100, 50]);
    assert!(statements[3].contains("i249\n;"));
}

#[test]
fn test_configurable_chunk_size() {
    let tmp = TempDir::new().unwrap();
    let path = write_dates_csv(tmp.path(), 10);
    let statements = transcribe(&path, 3).unwrap();
    assert_eq!(statements.len(), 1 + 4);
}

#[test]
fn test_no_rows_gives_create_only() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.csv");
    std::fs::write(&path, "a,b\n").unwrap();
    assert_eq!(transcribe(&path, 100).unwrap().len(), 1);
}

#[test]
fn test_zero_chunk_rejected() {
    let table = CsvTable::parse("a\n1\n", Path::new("x.csv")).unwrap();
    let vt = VolatileTable::new("x.csv", table);
    assert!(matches!(
        vt.insert_statements(0).unwrap_err(),
        SqlError::InvalidChunkSize
    ));
}

#[test]
fn test_missing_csv_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = transcribe(&tmp.path().join("ghost.csv"), 100).unwrap_err();
    assert!(matches!(err, SqlError::CsvNotFound { .. }));
}
