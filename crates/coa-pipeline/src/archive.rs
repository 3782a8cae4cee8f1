//! Archive: park the run area in a fresh output folder

use crate::context::RunContext;
use crate::error::PipelineResult;
use coa_core::layout::move_contents;
use std::path::PathBuf;

/// Move everything in the run area into a new output folder.
///
/// The run area is left empty. Returns the new folder.
pub fn archive(ctx: &RunContext, name: Option<&str>) -> PipelineResult<PathBuf> {
    let output = ctx.workdir.make_output_folder(name)?;
    move_contents(&ctx.workdir.run_dir(), &output)?;
    log::info!("run area archived to {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{workspace, write};
    use coa_core::runlog::RUN_LOG_FILE;

    #[test]
    fn test_archive_empties_run_area() {
        let (_tmp, ctx) = workspace("");
        let run = ctx.workdir.run_dir();
        write(&run.join("prod/demo/0001.main.coa.sql"), "select 1\n;\n");
        write(&run.join(RUN_LOG_FILE), "log line\n");

        let out = archive(&ctx, Some("manual save")).unwrap();

        assert!(out.file_name().unwrap().to_string_lossy().ends_with("-manual_save"));
        assert!(out.join("prod/demo/0001.main.coa.sql").is_file());
        assert!(out.join(RUN_LOG_FILE).is_file());
        assert!(run.is_dir());
        assert_eq!(std::fs::read_dir(&run).unwrap().count(), 0);
    }
}
