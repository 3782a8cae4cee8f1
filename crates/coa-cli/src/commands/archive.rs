//! Archive command implementation

use anyhow::{Context, Result};
use coa_core::runlog::RUN_LOG_FILE;
use coa_pipeline::archive;

use crate::cli::{ArchiveArgs, GlobalArgs};
use crate::commands::common::{attach_run_log, load_context};

/// Execute the archive command
pub async fn execute(args: &ArchiveArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let output = archive(&ctx, args.name.as_deref()).context("Archive failed")?;
    attach_run_log(&output.join(RUN_LOG_FILE))?;
    println!("Archived ready-to-run folder to {}", output.display());
    Ok(())
}
