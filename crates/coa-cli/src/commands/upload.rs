//! Upload command implementation

use anyhow::{Context, Result};
use coa_core::runlog::RUN_LOG_FILE;
use coa_pipeline::{upload, RunContext};
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, UploadArgs};
use crate::commands::common::{attach_run_log, load_context};

/// Execute the upload command
pub async fn execute(args: &UploadArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let folder = match &args.output {
        Some(path) => resolve_output(&ctx, Path::new(path)),
        None => ctx
            .workdir
            .read_last_run()
            .context("No output folder given and no last run recorded")?,
    };
    upload_output(&ctx, &folder).await
}

/// A relative folder that does not exist from here is taken from the
/// working directory
fn resolve_output(ctx: &RunContext, path: &Path) -> PathBuf {
    if path.is_relative() && !path.exists() {
        ctx.workdir.root().join(path)
    } else {
        path.to_path_buf()
    }
}

/// Upload one output folder, logging into that folder's run log
pub(crate) async fn upload_output(ctx: &RunContext, folder: &Path) -> Result<()> {
    if folder.is_dir() {
        attach_run_log(&folder.join(RUN_LOG_FILE))?;
    }
    let summary = upload(ctx, Some(folder)).await.context("Upload failed")?;
    println!(
        "Uploaded {} files ({} rows) from {} manifests, {} procedures called",
        summary.files, summary.rows, summary.manifests, summary.calls
    );
    Ok(())
}
