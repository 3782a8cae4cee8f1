//! Staging: copy fetched filesets into the per-system SQL store and apply
//! local overrides

use crate::context::RunContext;
use crate::error::PipelineResult;
use coa_core::layout::{copy_tree, purge_dir, sorted_entries};
use coa_core::CoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// Counts reported by [`stage`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSummary {
    /// `(system, fileset)` folders written to the SQL store
    pub staged: usize,
    /// Filesets with nothing in the download folder
    pub missing: Vec<String>,
    /// Files replaced from the override folder
    pub overrides: usize,
}

/// Rebuild the SQL store from the download folder.
///
/// Every resolved target gets `sql/<system>/<fileset>` as a copy of
/// `download/<fileset>`; the override folder is applied afterwards.
pub fn stage(ctx: &RunContext) -> PipelineResult<StageSummary> {
    let download = ctx.workdir.download_dir();
    let sql = ctx.workdir.sql_dir();
    log::info!("staging {} into {}", download.display(), sql.display());
    purge_dir(&sql)?;

    let mut summary = StageSummary::default();
    for target in &ctx.resolution().targets {
        let src = download.join(target.fileset_name.as_str());
        if !src.is_dir() {
            log::warn!(
                "{}/{}: nothing downloaded for this fileset",
                target.system_name,
                target.fileset_name
            );
            summary.missing.push(target.fileset_name.to_string());
            continue;
        }
        let dst = sql
            .join(target.system_name.as_str())
            .join(target.fileset_name.as_str());
        copy_tree(&src, &dst)?;
        log::debug!("  staged {}", dst.display());
        summary.staged += 1;
    }

    summary.overrides = apply_overrides(&ctx.workdir.override_dir(), &sql)?;
    Ok(summary)
}

/// Copy override files over the SQL store.
///
/// A file at the override root replaces every file of the same name
/// anywhere in the store. A file in an override subfolder replaces the file
/// at the same relative path, provided that folder exists in the store.
/// Returns the number of files replaced.
pub fn apply_overrides(override_dir: &Path, sql_dir: &Path) -> PipelineResult<usize> {
    if !override_dir.is_dir() {
        return Ok(0);
    }
    let store = files_under(sql_dir)?;
    let mut replaced = 0;

    for file in sorted_entries(override_dir, false)? {
        let Some(name) = file.file_name() else {
            continue;
        };
        for target in store.iter().filter(|p| p.file_name() == Some(name)) {
            copy_file(&file, target)?;
            log::info!("override applied: {}", target.display());
            replaced += 1;
        }
    }

    for folder in sorted_entries(override_dir, true)? {
        for file in files_under(&folder)? {
            let Ok(relative) = file.strip_prefix(override_dir) else {
                continue;
            };
            let target = sql_dir.join(relative);
            if target.parent().is_some_and(Path::is_dir) {
                copy_file(&file, &target)?;
                log::info!("override applied: {}", target.display());
                replaced += 1;
            } else {
                log::debug!("  override {} has no matching folder", relative.display());
            }
        }
    }

    Ok(replaced)
}

fn copy_file(from: &Path, to: &Path) -> PipelineResult<()> {
    fs::copy(from, to).map_err(|e| CoreError::io_at(from, e))?;
    Ok(())
}

/// Every non-hidden file below `dir`, depth first in name order
pub(crate) fn files_under(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut out = sorted_entries(dir, false)?;
    for sub in sorted_entries(dir, true)? {
        out.extend(files_under(&sub)?);
    }
    Ok(out)
}
