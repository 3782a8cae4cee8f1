//! Shared test utilities for coa-pipeline

use crate::context::RunContext;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// One system `prod` bound to fileset `demo`, DuckDB in memory
pub(crate) const BASE_CONFIG: &str = r#"
substitutions:
  account: "Acme"
  startdate: "global"
systems:
  prod:
    siteid: "SITE01"
    host: ""
    password: "s3cr3t"
    filesets:
      demo: { active: true }
reporting:
  db_coa: "coa"
  db_stg: "coa_stg"
"#;

/// Write `text` to `path`, creating parent folders
pub(crate) fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

/// A working directory with `BASE_CONFIG` plus `extra` config lines
pub(crate) fn workspace(extra: &str) -> (TempDir, RunContext) {
    workspace_with(&format!("{}{}", BASE_CONFIG, extra))
}

/// A working directory with exactly `config` as its config document
pub(crate) fn workspace_with(config: &str) -> (TempDir, RunContext) {
    let tmp = TempDir::new().unwrap();
    write(&tmp.path().join("config.yaml"), config);
    let ctx = RunContext::load(tmp.path(), None, None).unwrap();
    (tmp, ctx)
}

/// Install `yaml` as the fetched fileset catalog
pub(crate) fn with_catalog(ctx: &mut RunContext, yaml: &str) {
    write(&ctx.catalog_path(), yaml);
    ctx.reload_catalog().unwrap();
}
