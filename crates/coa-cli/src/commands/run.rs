//! Run command implementation: every phase in order

use anyhow::Result;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{fetch_and_stage, load_context};
use crate::commands::execute::execute_run_area;
use crate::commands::prepare::prepare_run_area;
use crate::commands::upload::upload_output;

/// Execute the run command
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = load_context(global)?;
    if args.skip_fetch {
        ctx.config.settings.skip_fetch = true;
    }

    fetch_and_stage(&mut ctx, None)?;
    prepare_run_area(&ctx)?;

    let summary = execute_run_area(&ctx, args.name.as_deref()).await?;
    let output = summary.output.clone();
    // partial results are kept but not uploaded
    summary.into_result()?;

    if args.skip_upload {
        println!("Upload skipped");
        return Ok(());
    }
    upload_output(&ctx, &output).await
}
