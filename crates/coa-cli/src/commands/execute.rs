//! Execute command implementation

use anyhow::{Context, Result};
use coa_core::runlog::RUN_LOG_FILE;
use coa_pipeline::{ExecuteSummary, RunContext};

use crate::cli::{ExecuteArgs, GlobalArgs};
use crate::commands::common::{attach_run_log, load_context};

/// Execute the execute command
pub async fn execute(args: &ExecuteArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let summary = execute_run_area(&ctx, args.name.as_deref()).await?;
    summary.into_result()?;
    Ok(())
}

/// Execute the run area, follow the run log into the output folder and
/// print the outcome
pub(crate) async fn execute_run_area(ctx: &RunContext, name: Option<&str>) -> Result<ExecuteSummary> {
    let summary = coa_pipeline::execute(ctx, name)
        .await
        .context("Execute failed")?;
    attach_run_log(&summary.output.join(RUN_LOG_FILE))?;

    println!("Output: {}", summary.output.display());
    println!(
        "Executed {} statements, saved {} result files, {} manifest entries",
        summary.statements, summary.saved, summary.manifest_entries
    );
    for system in &summary.failed {
        println!("  Failed: {}", system);
    }
    Ok(summary)
}
