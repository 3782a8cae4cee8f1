//! Preparation: turn staged SQL templates into ready-to-run SQL
//!
//! For every resolved `(system, fileset)` the fileset folder is copied into
//! `run/<system>/<fileset>` and each listed `.coa.sql` template is rewritten
//! there:
//!
//! 1. substitution scopes are applied in precedence order;
//! 2. the text is split into statements and lightly formatted;
//! 3. per statement, `file` includes are spliced in place, `temp` CSVs are
//!    materialised as volatile tables ahead of the statement, and `loop`
//!    CSVs expand the statement once per row;
//! 4. `save`, `load` and `call` directives are left for the execute phase.
//!
//! A prepared file is only written once all of its statements prepared.

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use coa_core::layout::{copy_tree, is_template, sorted_entries};
use coa_core::runlog::RUN_LOG_FILE;
use coa_core::{CoreError, ScopeStack};
use coa_sql::directive::{render_pattern, ANNOTATION_PATTERN, INCLUDE_PATTERN};
use coa_sql::{
    extract, format_fragment, has_sql_content, split_and_format, transcribe, CsvTable,
    DirectiveKey,
};
use std::fs;
use std::path::{Path, PathBuf};

/// How deep `file` includes may nest
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Everything except `file`, for the include pass
const NON_INCLUDE_KEYS: [DirectiveKey; 5] = [
    DirectiveKey::Temp,
    DirectiveKey::Loop,
    DirectiveKey::Save,
    DirectiveKey::Load,
    DirectiveKey::Call,
];

const PREPARE_ONLY_KEYS: [DirectiveKey; 3] =
    [DirectiveKey::File, DirectiveKey::Temp, DirectiveKey::Loop];

/// Directives a prepared statement carries into the execute phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostExecute {
    pub save: Option<String>,
    pub load: Option<String>,
    pub call: Option<String>,
}

impl PostExecute {
    /// Read the `save`/`load`/`call` directives of `sql`
    pub fn scan(sql: &str) -> Self {
        let ext = extract(sql, "", &PREPARE_ONLY_KEYS);
        Self {
            save: ext.get(DirectiveKey::Save).map(str::to_string),
            load: ext.get(DirectiveKey::Load).map(str::to_string),
            call: ext.get(DirectiveKey::Call).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.save.is_none() && self.load.is_none() && self.call.is_none()
    }
}

/// One statement of a prepared file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    /// Statement text, terminated with `\n;`
    pub sql: String,
    pub post_execute: PostExecute,
    /// Generated from one row of a `loop` CSV
    pub from_loop: bool,
}

impl PreparedStatement {
    fn new(sql: String, from_loop: bool) -> Self {
        let post_execute = PostExecute::scan(&sql);
        Self {
            sql,
            post_execute,
            from_loop,
        }
    }
}

/// A prepared template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    pub name: String,
    pub statements: Vec<PreparedStatement>,
}

impl PreparedFile {
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// File content: statements separated by a blank line
    pub fn render(&self) -> String {
        let mut out = self
            .statements
            .iter()
            .map(|s| s.sql.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        out.push('\n');
        out
    }
}

/// Prepares templates of one fileset folder
#[derive(Debug, Clone, Copy)]
pub struct Preparer<'a> {
    scopes: &'a ScopeStack,
    /// Folder that `file`, `temp` and `loop` paths are relative to
    dir: &'a Path,
    chunk_rows: usize,
}

impl<'a> Preparer<'a> {
    pub fn new(scopes: &'a ScopeStack, dir: &'a Path, chunk_rows: usize) -> Self {
        Self {
            scopes,
            dir,
            chunk_rows,
        }
    }

    /// Read and prepare the template at `path`
    pub fn prepare_file(&self, path: &Path) -> PipelineResult<PreparedFile> {
        let name = file_name(path);
        let text = fs::read_to_string(path).map_err(|e| CoreError::io_at(path, e))?;
        log::info!("  processing {} ({} characters)", name, text.len());
        self.prepare_text(&name, &text)
            .map_err(|source| PipelineError::PrepareFailed {
                file: path.display().to_string(),
                source: Box::new(source),
            })
    }

    /// Prepare template text
    pub fn prepare_text(&self, name: &str, text: &str) -> PipelineResult<PreparedFile> {
        let substituted = self.scopes.apply(text);
        let mut statements = Vec::new();
        for (i, statement) in split_and_format(&substituted).iter().enumerate() {
            log::debug!("  SQL {}: {}...", i + 1, preview(statement));
            self.prepare_statement(statement, &mut statements)?;
        }
        Ok(PreparedFile {
            name: name.to_string(),
            statements,
        })
    }

    fn prepare_statement(
        &self,
        statement: &str,
        out: &mut Vec<PreparedStatement>,
    ) -> PipelineResult<()> {
        let spliced = self.splice_includes(statement, 0)?;
        let ext = extract(&spliced, ANNOTATION_PATTERN, &DirectiveKey::POST_EXECUTE);
        let mut sql = ext.text.clone();
        let mut emit_base = true;

        if let Some(csv) = ext.get(DirectiveKey::Temp) {
            let mut created = transcribe(&self.dir.join(csv), self.chunk_rows)?;
            sql = fill_slot(
                &sql,
                DirectiveKey::Temp,
                &format!("above volatile table create script for {}", csv),
            );
            // nothing left but the annotation: it heads the CREATE instead
            if !has_sql_content(&sql) {
                if let Some(create) = created.first_mut() {
                    *create = format!("{}\n{}", strip_terminator(&sql), create);
                }
                emit_base = false;
            }
            out.extend(created.into_iter().map(|s| PreparedStatement::new(s, false)));
        }

        if let Some(csv) = ext.get(DirectiveKey::Loop) {
            let table = CsvTable::read(&self.dir.join(csv))?;
            let rows = table.row_count();
            log::info!("    loop over {}: {} rows", csv, rows);
            for row in 0..rows {
                let mut copy = sql.clone();
                for (column, value) in table.row_pairs(row) {
                    copy = copy.replace(&format!("{{{}}}", column), value);
                }
                copy = fill_slot(
                    &copy,
                    DirectiveKey::Loop,
                    &format!(" csv row {} out of {} ", row + 1, rows),
                );
                out.push(PreparedStatement::new(copy, true));
            }
            emit_base = false;
        }

        if emit_base {
            out.push(PreparedStatement::new(sql, false));
        }
        Ok(())
    }

    /// Replace a `file` directive with the named file's content, wrapped in
    /// BEGIN/END comments. Included text goes through the same substitution
    /// scopes and may include further files. The host statement keeps its own
    /// terminator, so a trailing `;` in the included file is dropped.
    fn splice_includes(&self, text: &str, depth: usize) -> PipelineResult<String> {
        let ext = extract(text, INCLUDE_PATTERN, &NON_INCLUDE_KEYS);
        let Some(target) = ext.get(DirectiveKey::File) else {
            return Ok(text.to_string());
        };
        let slot = render_pattern(INCLUDE_PATTERN, DirectiveKey::File, target);
        let path = self.dir.join(target);
        if !path.is_file() {
            log::warn!("    include file missing, directive dropped: {}", path.display());
            return Ok(ext.text);
        }
        if depth >= MAX_INCLUDE_DEPTH {
            return Err(PipelineError::IncludeDepthExceeded {
                path: path.display().to_string(),
                limit: MAX_INCLUDE_DEPTH,
            });
        }

        log::info!("    including {}", target);
        let raw = fs::read_to_string(&path).map_err(|e| CoreError::io_at(&path, e))?;
        let nested = self.splice_includes(&self.scopes.apply(&raw), depth + 1)?;
        let body = format_fragment(&nested).unwrap_or_default();
        let block = format!(
            "/* BEGIN file insert: {t} */\n{}\n/* END file insert: {t} */",
            strip_terminator(&body),
            t = target
        );
        Ok(ext.text.replacen(&slot, &block, 1))
    }
}

/// Put `annotation` into the replaced directive's comment
fn fill_slot(sql: &str, key: DirectiveKey, annotation: &str) -> String {
    sql.replacen(&format!("{{{{replaceMe:{}}}}}", key), annotation, 1)
}

fn strip_terminator(sql: &str) -> &str {
    sql.trim_end().trim_end_matches(';').trim_end()
}

fn preview(sql: &str) -> String {
    sql.chars()
        .take(50)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Counts reported by [`prepare`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    /// Prepared files written
    pub files: usize,
    /// Statements across all prepared files
    pub statements: usize,
    /// `run/<system>/<folder>` folders populated
    pub folders: Vec<PathBuf>,
    /// Listed templates or fileset folders that were not found
    pub missing: Vec<String>,
}

/// Prepare every resolved fileset into the run area.
///
/// The run area is emptied first (the run log survives). A fatal error
/// aborts the whole preparation.
pub fn prepare(ctx: &RunContext) -> PipelineResult<PrepareSummary> {
    let run = ctx.workdir.run_dir();
    let sql = ctx.workdir.sql_dir();
    let download = ctx.workdir.download_dir();
    log::info!("preparing SQL from {} into {}", sql.display(), run.display());
    clear_run_area(&run)?;

    let mut summary = PrepareSummary::default();
    for target in &ctx.resolution().targets {
        let system = target.system_name.as_str();
        let fileset = target.fileset_name.as_str();
        log::info!("SYSTEM: {}   FILESET: {}", system, fileset);

        let staged = sql.join(system).join(fileset);
        let src = if staged.is_dir() {
            staged
        } else if download.join(fileset).is_dir() {
            log::info!("  not staged, reading {} from the download folder", fileset);
            download.join(fileset)
        } else {
            log::warn!("  no SQL folder for {}/{}, skipping", system, fileset);
            summary.missing.push(format!("{}/{}", system, fileset));
            continue;
        };

        let dest = run.join(system).join(fileset);
        stage_assets(&src, &dest)?;
        summary.folders.push(dest.clone());

        let scopes = target.scope_stack(&ctx.config);
        let preparer = Preparer::new(&scopes, &dest, ctx.chunk_rows());
        for name in target.fileset.file_names().filter(|n| is_template(n)) {
            let path = src.join(name);
            if !path.is_file() {
                log::warn!("  listed template not found: {}", path.display());
                summary.missing.push(format!("{}/{}", fileset, name));
                continue;
            }
            write_prepared(&preparer, &path, &dest, &mut summary)?;
        }
    }

    if ctx.config.settings.run_non_fileset_folders {
        prepare_non_fileset_folders(ctx, &mut summary)?;
    }

    log::info!(
        "prepared {} files, {} statements",
        summary.files,
        summary.statements
    );
    Ok(summary)
}

/// Folders under `sql/<system>/` that are not catalog filesets: every
/// template in name order, with system, global and reporting scopes.
fn prepare_non_fileset_folders(
    ctx: &RunContext,
    summary: &mut PrepareSummary,
) -> PipelineResult<()> {
    let run = ctx.workdir.run_dir();
    for system_dir in sorted_entries(&ctx.workdir.sql_dir(), true)? {
        let system_name = file_name(&system_dir);
        let Some(system) = ctx.config.system(&system_name).filter(|s| s.active) else {
            log::info!("folder {} is not an active system, skipping", system_name);
            continue;
        };
        let scopes = ScopeStack::new()
            .with(system.scope())
            .with(ctx.config.global_scope())
            .with(ctx.config.reporting_scope());

        for folder in sorted_entries(&system_dir, true)? {
            let folder_name = file_name(&folder);
            if ctx.catalog.contains(&folder_name) {
                continue;
            }
            log::info!(
                "SYSTEM: {}   FOLDER: {} (not a catalog fileset)",
                system_name,
                folder_name
            );
            let dest = run.join(&system_name).join(&folder_name);
            stage_assets(&folder, &dest)?;
            summary.folders.push(dest.clone());

            let preparer = Preparer::new(&scopes, &dest, ctx.chunk_rows());
            for path in sorted_entries(&folder, false)? {
                if is_template(&file_name(&path)) {
                    write_prepared(&preparer, &path, &dest, summary)?;
                }
            }
        }
    }
    Ok(())
}

fn write_prepared(
    preparer: &Preparer<'_>,
    path: &Path,
    dest: &Path,
    summary: &mut PrepareSummary,
) -> PipelineResult<()> {
    let prepared = preparer.prepare_file(path)?;
    let out = dest.join(&prepared.name);
    fs::write(&out, prepared.render()).map_err(|e| CoreError::io_at(&out, e))?;
    log::info!("  wrote {} ({} statements)", out.display(), prepared.len());
    summary.files += 1;
    summary.statements += prepared.len();
    Ok(())
}

/// Copy everything except top-level templates from `src` to `dest`
fn stage_assets(src: &Path, dest: &Path) -> PipelineResult<()> {
    fs::create_dir_all(dest).map_err(|e| CoreError::io_at(dest, e))?;
    for path in sorted_entries(src, true)? {
        copy_tree(&path, &dest.join(file_name(&path)))?;
    }
    for path in sorted_entries(src, false)? {
        let name = file_name(&path);
        if !is_template(&name) {
            let to = dest.join(&name);
            fs::copy(&path, &to).map_err(|e| CoreError::io_at(&path, e))?;
        }
    }
    Ok(())
}

/// Empty the run area, keeping the run log
fn clear_run_area(run: &Path) -> PipelineResult<()> {
    fs::create_dir_all(run).map_err(|e| CoreError::io_at(run, e))?;
    for entry in fs::read_dir(run).map_err(|e| CoreError::io_at(run, e))? {
        let path = entry.map_err(|e| CoreError::io_at(run, e))?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| CoreError::io_at(&path, e))?;
        } else if file_name(&path) != RUN_LOG_FILE {
            fs::remove_file(&path).map_err(|e| CoreError::io_at(&path, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "prepare_test.rs"]
mod tests;
