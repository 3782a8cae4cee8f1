//! Upload phase: load saved results into the reporting database

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use coa_core::layout::sorted_entries;
use coa_core::manifest::MANIFEST_FILE;
use coa_core::{CoreError, UploadManifest};
use coa_db::{connect, Database};
use std::path::{Path, PathBuf};

/// Outcome of [`upload`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Output folder that was uploaded
    pub output: PathBuf,
    /// Manifests found under the output folder
    pub manifests: usize,
    /// Result files appended to a table
    pub files: usize,
    /// Rows appended across all files
    pub rows: usize,
    /// Procedures called after a load
    pub calls: usize,
}

/// Upload every manifest under an output folder.
///
/// Without an explicit folder the last-run pointer is followed.
pub async fn upload(ctx: &RunContext, output: Option<&Path>) -> PipelineResult<UploadSummary> {
    let folder = match output {
        Some(path) => {
            if !path.is_dir() {
                return Err(CoreError::InvalidOutputFolder {
                    path: path.display().to_string(),
                }
                .into());
            }
            path.to_path_buf()
        }
        None => ctx.workdir.read_last_run()?,
    };
    log::info!("uploading results from {}", folder.display());

    let db = connect(&ctx.config.reporting_connection(), ctx.config.settings.skip_db)?;
    let schema = ctx.config.reporting.staging_schema();
    upload_folder(db.as_ref(), &folder, schema.as_deref()).await
}

/// Upload the manifests under `folder` through an open connection.
///
/// Tables without a schema are qualified with `default_schema`.
pub async fn upload_folder(
    db: &dyn Database,
    folder: &Path,
    default_schema: Option<&str>,
) -> PipelineResult<UploadSummary> {
    let mut summary = UploadSummary {
        output: folder.to_path_buf(),
        ..UploadSummary::default()
    };

    for dir in manifest_folders(folder)? {
        let manifest = UploadManifest::load(&dir)?;
        summary.manifests += 1;
        if manifest.is_empty() {
            log::info!("nothing to upload in {}", dir.display());
            continue;
        }

        for entry in &manifest.entries {
            let table = qualify(&entry.table, default_schema);
            let path = dir.join(&entry.file);
            if !path.is_file() {
                return Err(PipelineError::ManifestFileMissing {
                    path: path.display().to_string(),
                });
            }

            let rows = db
                .append_csv(&table, &path)
                .await
                .map_err(|source| PipelineError::UploadFailed {
                    file: entry.file.clone(),
                    table: table.clone(),
                    source,
                })?;
            log::info!("  {} -> {} ({} rows)", entry.file, table, rows);
            summary.files += 1;
            summary.rows += rows;

            let call = entry.call.trim();
            if !call.is_empty() {
                db.call_procedure(call)
                    .await
                    .map_err(|source| PipelineError::UploadFailed {
                        file: entry.file.clone(),
                        table: table.clone(),
                        source,
                    })?;
                log::info!("  called {}", call);
                summary.calls += 1;
            }
        }
    }

    log::info!(
        "upload done: {} manifests, {} files, {} rows, {} calls",
        summary.manifests,
        summary.files,
        summary.rows,
        summary.calls
    );
    Ok(summary)
}

/// `schema.table` stays as is; a bare table gets `default_schema`
pub fn qualify(table: &str, default_schema: Option<&str>) -> String {
    let table = table.trim();
    match default_schema {
        Some(schema) if !table.contains('.') => format!("{}.{}", schema, table),
        _ => table.to_string(),
    }
}

/// Folders at or below `dir` holding a manifest, hidden folders skipped
fn manifest_folders(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    if dir.join(MANIFEST_FILE).is_file() {
        out.push(dir.to_path_buf());
    }
    for child in sorted_entries(dir, true)? {
        out.extend(manifest_folders(&child)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{workspace, write};
    use coa_core::ManifestEntry;
    use coa_db::DuckDbBackend;
    use tempfile::TempDir;

    fn manifest(dir: &Path, entries: &[(&str, &str, &str)]) {
        UploadManifest {
            entries: entries
                .iter()
                .map(|(file, table, call)| ManifestEntry {
                    file: file.to_string(),
                    table: table.to_string(),
                    call: call.to_string(),
                })
                .collect(),
        }
        .save(dir)
        .unwrap();
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("t", Some("stg")), "stg.t");
        assert_eq!(qualify("db.t", Some("stg")), "db.t");
        assert_eq!(qualify("t", None), "t");
    }

    #[tokio::test]
    async fn test_upload_folder_stops_on_failed_call() {
        let tmp = TempDir::new().unwrap();
        let set = tmp.path().join("prod").join("demo");
        write(&set.join("a.csv"), "id,name\n1,Alice\n2,Bob\n");
        write(&set.join("b.csv"), "id\n7\n");
        manifest(
            &set,
            &[("a.csv", "people", ""), ("b.csv", "other.ids", "no_such_proc")],
        );

        let db = DuckDbBackend::in_memory().unwrap();
        let err = upload_folder(&db, tmp.path(), Some("stg")).await.unwrap_err();
        // the call fails, but both loads before it went through
        match err {
            PipelineError::UploadFailed { file, source, .. } => {
                assert_eq!(file, "b.csv");
                assert!(matches!(source, coa_db::DbError::CallError { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(db.relation_exists("stg.people").await.unwrap());
        assert!(db.relation_exists("other.ids").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_folder_counts_rows() {
        let tmp = TempDir::new().unwrap();
        let one = tmp.path().join("prod").join("demo");
        let two = tmp.path().join("qa").join("demo");
        write(&one.join("a.csv"), "id\n1\n2\n");
        write(&two.join("a.csv"), "id\n3\n");
        manifest(&one, &[("a.csv", "ids", "")]);
        manifest(&two, &[("a.csv", "ids", "")]);
        // hidden folders are never searched
        let hidden = tmp.path().join(".trash");
        write(&hidden.join("a.csv"), "id\n9\n");
        manifest(&hidden, &[("a.csv", "ids", "")]);

        let db = DuckDbBackend::in_memory().unwrap();
        let summary = upload_folder(&db, tmp.path(), Some("stg")).await.unwrap();
        assert_eq!(summary.manifests, 2);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.rows, 3);

        let result = db.run("SELECT count(*) FROM stg.ids").await.unwrap();
        assert_eq!(result.rows[0][0].as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        manifest(tmp.path(), &[("gone.csv", "t", "")]);
        let db = DuckDbBackend::in_memory().unwrap();
        let err = upload_folder(&db, tmp.path(), None).await.unwrap_err();
        assert!(matches!(err, PipelineError::ManifestFileMissing { .. }));
    }

    #[tokio::test]
    async fn test_upload_without_last_run() {
        let (_tmp, ctx) = workspace("settings:\n  skip_db: true\n");
        let err = upload(&ctx, None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Core(CoreError::NoLastRun { .. })));
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_folder() {
        let (tmp, ctx) = workspace("settings:\n  skip_db: true\n");
        let err = upload(&ctx, Some(&tmp.path().join("nope"))).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Core(CoreError::InvalidOutputFolder { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_follows_last_run_with_skip_db() {
        let (_tmp, ctx) = workspace("settings:\n  skip_db: true\n");
        let out = ctx.workdir.make_output_folder(Some("x")).unwrap();
        ctx.workdir.write_last_run(&out).unwrap();
        write(&out.join("prod/demo/a.csv"), "id\n1\n");
        manifest(&out.join("prod/demo"), &[("a.csv", "t", "p")]);

        let summary = upload(&ctx, None).await.unwrap();
        assert_eq!(summary.output, out);
        assert_eq!(summary.files, 1);
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.calls, 1);
    }
}
