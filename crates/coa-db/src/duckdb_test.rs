use super::*;
use tempfile::TempDir;

fn write_csv(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[tokio::test]
async fn test_run_select_collects_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = db
        .run("SELECT 1 AS id, 'Acme' AS site, NULL AS gap, CAST(2.5 AS DOUBLE) AS ratio")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["id", "site", "gap", "ratio"]);
    assert_eq!(
        result.rows,
        vec![vec![
            Some("1".to_string()),
            Some("Acme".to_string()),
            None,
            Some("2.5".to_string()),
        ]]
    );
}

#[tokio::test]
async fn test_run_ddl_returns_empty_result() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = db.run("CREATE TABLE t (id INT)").await.unwrap();
    assert!(result.is_empty());
    assert!(result.columns.is_empty());

    let result = db.run("INSERT INTO t VALUES (1), (2)").await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_run_select_after_leading_comment() {
    let db = DuckDbBackend::in_memory().unwrap();
    let result = db
        .run("/* {{replaceMe:temp}} */\nSELECT CAST(DATE '2024-01-05' AS VARCHAR) AS d")
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Some("2024-01-05".to_string())]]);
}

#[tokio::test]
async fn test_run_error_carries_statement() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.run("SELEC 1").await.unwrap_err();
    assert!(err.to_string().contains("SELEC 1"));
}

#[tokio::test]
async fn test_relation_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());

    db.execute("CREATE SCHEMA db_stg").await.unwrap();
    db.execute("CREATE TABLE db_stg.usage (id INT)").await.unwrap();
    assert!(db.relation_exists("db_stg.usage").await.unwrap());
    assert!(!db.relation_exists("usage").await.unwrap());
}

#[tokio::test]
async fn test_append_csv_creates_and_appends() {
    let tmp = TempDir::new().unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let path = write_csv(tmp.path(), "a.csv", "site,cpu\nAcme,10\nAcme,20\n");

    let loaded = db.append_csv("db_stg.cpu_usage", &path).await.unwrap();
    assert_eq!(loaded, 2);
    let loaded = db.append_csv("db_stg.cpu_usage", &path).await.unwrap();
    assert_eq!(loaded, 2);

    let result = db
        .run("SELECT COUNT(*) AS n FROM db_stg.cpu_usage")
        .await
        .unwrap();
    assert_eq!(result.rows[0][0].as_deref(), Some("4"));
}

#[tokio::test]
async fn test_append_csv_skips_unnamed_columns() {
    let tmp = TempDir::new().unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let path = write_csv(tmp.path(), "b.csv", "Unnamed: 0,site\n0,Acme\n1,Beta\n");

    db.append_csv("sites", &path).await.unwrap();
    let result = db.run("SELECT * FROM sites ORDER BY site").await.unwrap();
    assert_eq!(result.columns, vec!["site"]);
    assert_eq!(result.row_count(), 2);
}

#[tokio::test]
async fn test_append_csv_missing_file() {
    let tmp = TempDir::new().unwrap();
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db
        .append_csv("t", &tmp.path().join("ghost.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::CsvError(_)));
}

#[tokio::test]
async fn test_call_missing_procedure_is_call_error() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.call_procedure("db_stg.sp_merge").await.unwrap_err();
    assert!(matches!(err, DbError::CallError { .. }));
}

#[tokio::test]
async fn test_from_path_persists() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("collect.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute("CREATE TABLE kept AS SELECT 1 AS id").await.unwrap();
    }
    let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    assert!(db.relation_exists("kept").await.unwrap());
}
