//! Fetch command implementation

use anyhow::Result;

use crate::cli::{FetchArgs, GlobalArgs};
use crate::commands::common::{fetch_and_stage, load_context};

/// Execute the fetch command
pub async fn execute(args: &FetchArgs, global: &GlobalArgs) -> Result<()> {
    let mut ctx = load_context(global)?;
    fetch_and_stage(&mut ctx, args.host.as_deref())
}
