//! Execute phase: run prepared SQL against each source system
//!
//! Every `run/<system>/<fileset>` folder is moved into a fresh timestamped
//! output folder and its `.coa.sql` files are executed there in name order,
//! one connection per system. Non-empty results are saved as CSV next to the
//! SQL and recorded in that folder's upload manifest.

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use coa_core::layout::{is_template, move_contents, sorted_entries};
use coa_core::{CoreError, ManifestBuilder, SourceSystem};
use coa_db::{connect, Database};
use coa_sql::{extract, has_sql_content, DirectiveKey};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of [`execute`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteSummary {
    /// Timestamped output folder of this run
    pub output: PathBuf,
    /// Statements sent to a database
    pub statements: usize,
    /// Result files written
    pub saved: usize,
    /// Manifest entries across all filesets
    pub manifest_entries: usize,
    /// Systems whose execution stopped on an error
    pub failed: Vec<String>,
}

impl ExecuteSummary {
    /// Turn recorded system failures into an error
    pub fn into_result(self) -> PipelineResult<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(PipelineError::SystemsFailed {
                count: self.failed.len(),
                systems: self.failed.join(", "),
            })
        }
    }
}

/// Execute everything in the run area.
///
/// A failing statement stops the remaining statements of its system; other
/// systems still run. Failures are listed in the returned summary.
pub async fn execute(ctx: &RunContext, name: Option<&str>) -> PipelineResult<ExecuteSummary> {
    let run = ctx.workdir.run_dir();
    let output = ctx.workdir.make_output_folder(name)?;
    ctx.workdir.write_last_run(&output)?;
    log::info!("last-run output: {}", output.display());

    let mut summary = ExecuteSummary {
        output: output.clone(),
        ..ExecuteSummary::default()
    };

    for system_dir in sorted_entries(&run, true)? {
        let system_name = file_name(&system_dir);
        let Some(system) = ctx.config.system(&system_name) else {
            log::warn!("system folder '{}' is not in the config, skipping", system_name);
            continue;
        };
        if !system.active {
            log::info!("system '{}' is inactive, skipping", system_name);
            continue;
        }
        let filesets = fileset_folders(ctx, system, &system_dir)?;
        if filesets.is_empty() {
            continue;
        }
        if let Err(e) = run_system(ctx, &system_name, system, &filesets, &output, &mut summary).await
        {
            log::error!("{}", e);
            summary.failed.push(system_name);
        }
    }

    log::info!("moving remaining run artifacts to {}", output.display());
    move_contents(&run, &output)?;
    copy_operational_files(ctx, &output)?;

    log::info!(
        "execute done: {} statements, {} result files, {} manifest entries, {} failed systems",
        summary.statements,
        summary.saved,
        summary.manifest_entries,
        summary.failed.len()
    );
    Ok(summary)
}

/// Fileset folders of one system that should run
fn fileset_folders(
    ctx: &RunContext,
    system: &SourceSystem,
    system_dir: &Path,
) -> PipelineResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for folder in sorted_entries(system_dir, true)? {
        let name = file_name(&folder);
        let wanted = if ctx.catalog.contains(&name) {
            system.binding(&name).is_some_and(|b| b.active)
        } else {
            ctx.config.settings.run_non_fileset_folders
        };
        if wanted {
            out.push(folder);
        } else {
            log::warn!("folder '{}' is not an active fileset of this system, skipping", name);
        }
    }
    Ok(out)
}

async fn run_system(
    ctx: &RunContext,
    system_name: &str,
    system: &SourceSystem,
    filesets: &[PathBuf],
    output: &Path,
    summary: &mut ExecuteSummary,
) -> PipelineResult<()> {
    let db = connect(&ctx.config.system_connection(system), ctx.config.settings.skip_db)?;

    for set_dir in filesets {
        let fileset = file_name(set_dir);
        log::info!("SYSTEM: {}   FILESET: {}", system_name, fileset);
        let out_dir = output.join(system_name).join(&fileset);
        move_contents(set_dir, &out_dir)?;
        fs::remove_dir(set_dir).map_err(|e| CoreError::io_at(set_dir, e))?;

        let mut builder = ManifestBuilder::new(&out_dir, system_name, &fileset);
        let result = run_fileset(db.as_ref(), system_name, &fileset, &mut builder, summary).await;
        // entries saved before a failure stay uploadable
        let manifest = builder.finish()?;
        summary.manifest_entries += manifest.entries.len();
        result?;
    }
    Ok(())
}

async fn run_fileset(
    db: &dyn Database,
    system: &str,
    fileset: &str,
    builder: &mut ManifestBuilder,
    summary: &mut ExecuteSummary,
) -> PipelineResult<()> {
    let files: Vec<PathBuf> = sorted_entries(builder.folder(), false)?
        .into_iter()
        .filter(|p| is_template(&file_name(p)))
        .collect();
    if files.is_empty() {
        log::warn!("no .coa.sql files in {}", builder.folder().display());
    }

    for path in files {
        let file = file_name(&path);
        log::info!("  executing {}", file);
        let text = fs::read_to_string(&path).map_err(|e| CoreError::io_at(&path, e))?;

        for (i, fragment) in text.split(';').enumerate() {
            let seq = i + 1;
            if !has_sql_content(fragment) {
                continue;
            }
            let ext = extract(fragment, "", &[]);
            log::debug!("  SQL #{}", seq);

            let result = db
                .run(ext.text.trim())
                .await
                .map_err(|source| PipelineError::StatementFailed {
                    system: system.to_string(),
                    fileset: fileset.to_string(),
                    file: file.clone(),
                    seq,
                    source,
                })?;
            summary.statements += 1;

            if result.is_empty() {
                if ext.contains(DirectiveKey::Load) {
                    log::info!("  SQL #{} returned no rows, no manifest entry", seq);
                }
                continue;
            }

            let name = builder.reserve(ext.get(DirectiveKey::Save), &file, seq)?;
            let csv_path = builder.path_for(&name);
            result.write_csv(&csv_path)?;
            log::info!("  saved {} rows to {}", result.row_count(), name);
            summary.saved += 1;
            builder.record(&name, ext.get(DirectiveKey::Load), ext.get(DirectiveKey::Call));
        }
    }
    Ok(())
}

/// Copy the last-run pointer, config and catalog next to the results
fn copy_operational_files(ctx: &RunContext, output: &Path) -> PipelineResult<()> {
    let pointer = ctx.workdir.root().join(coa_core::layout::LAST_RUN_FILE);
    for src in [pointer, ctx.config_path.clone(), ctx.catalog_path()] {
        let Some(name) = src.file_name() else {
            continue;
        };
        if src.is_file() {
            let dst = output.join(name);
            fs::copy(&src, &dst).map_err(|e| CoreError::io_at(&src, e))?;
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "execute_test.rs"]
mod tests;
