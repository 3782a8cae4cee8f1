//! Prepare command implementation

use anyhow::{Context, Result};
use coa_pipeline::{prepare, PrepareSummary, RunContext};

use crate::cli::{GlobalArgs, PrepareArgs};
use crate::commands::common::load_context;

/// Execute the prepare command
pub async fn execute(args: &PrepareArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let summary = prepare_run_area(&ctx)?;
    if args.list {
        for folder in &summary.folders {
            println!("  {}", folder.display());
        }
    }
    Ok(())
}

/// Prepare the run area and print what was written
pub(crate) fn prepare_run_area(ctx: &RunContext) -> Result<PrepareSummary> {
    let summary = prepare(ctx).context("Prepare failed")?;
    println!(
        "Prepared {} files ({} statements) in {} folders",
        summary.files,
        summary.statements,
        summary.folders.len()
    );
    for missing in &summary.missing {
        println!("  Not found: {}", missing);
    }
    Ok(summary)
}
