//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use coa_core::runlog::RUN_LOG_FILE;
use coa_core::{RunLog, RunLogHandle, Secrets};
use coa_pipeline::{fetch, stage, LocalContentHost, RunContext};
use log::LevelFilter;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use crate::cli::GlobalArgs;

static RUN_LOG: OnceLock<RunLogHandle> = OnceLock::new();

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and cleanup happens properly.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Intentionally empty: ExitCode is a control-flow mechanism, not a
        // user-facing error.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Install the run log as the global logger.
///
/// Lines are buffered until [`load_context`] attaches the log file.
pub(crate) fn init_logging(global: &GlobalArgs) -> Result<()> {
    let level = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let handle = RunLog::new(level, global.verbose)
        .install()
        .context("Failed to install the run log")?;
    let _ = RUN_LOG.set(handle);
    Ok(())
}

/// Send the run log to `path` from now on
pub(crate) fn attach_run_log(path: &Path) -> Result<()> {
    if let Some(handle) = RUN_LOG.get() {
        handle
            .attach_file(path)
            .with_context(|| format!("Failed to open run log {}", path.display()))?;
    }
    Ok(())
}

/// Mask every known secret in `text`
pub(crate) fn redact(text: &str) -> String {
    match RUN_LOG.get() {
        Some(handle) => handle.redact(text),
        None => text.to_string(),
    }
}

/// Load the run context for the working directory.
///
/// Secret values are registered for redaction before the config is parsed,
/// since substitution logs what it replaces. Configured passwords are added
/// once the config is loaded, and the run log is attached inside the
/// ready-to-run folder.
pub(crate) fn load_context(global: &GlobalArgs) -> Result<RunContext> {
    let root = Path::new(&global.dir);
    let secrets_path = RunContext::secrets_path(root, global.secrets.as_deref().map(Path::new));
    let secrets = Secrets::load(&secrets_path)
        .with_context(|| format!("Failed to load secrets {}", secrets_path.display()))?;
    if let Some(handle) = RUN_LOG.get() {
        handle.set_secrets(secrets.values());
    }

    let ctx = RunContext::load_with_secrets(root, global.config.as_deref().map(Path::new), secrets)
        .with_context(|| format!("Failed to load working directory {}", root.display()))?;

    if let Some(handle) = RUN_LOG.get() {
        handle.set_secrets(known_secrets(&ctx));
    }
    attach_run_log(&ctx.workdir.run_dir().join(RUN_LOG_FILE))?;
    log::info!("working directory: {}", ctx.workdir.root().display());
    Ok(ctx)
}

fn known_secrets(ctx: &RunContext) -> Vec<String> {
    let mut secrets = ctx.secrets.values();
    secrets.extend(ctx.config.systems.values().map(|s| s.password.clone()));
    secrets.push(ctx.config.reporting.password.clone());
    secrets.retain(|s| !s.is_empty());
    secrets.sort();
    secrets.dedup();
    secrets
}

/// Fetch from the content host (unless disabled) and rebuild the SQL store
pub(crate) fn fetch_and_stage(ctx: &mut RunContext, host: Option<&str>) -> Result<()> {
    if ctx.config.settings.skip_fetch {
        println!("Fetch skipped (settings.skip_fetch)");
    } else {
        let location = host.unwrap_or(&ctx.config.settings.content_host).to_string();
        let host = LocalContentHost::from_location(&location)?;
        let fetched = fetch(ctx, &host).context("Fetch failed")?;
        println!(
            "Fetched {} files in {} filesets",
            fetched.files, fetched.filesets
        );
        for missing in &fetched.missing {
            println!("  Missing on content host: {}", missing);
        }
    }

    let staged = stage(ctx).context("Stage failed")?;
    println!(
        "Staged {} fileset folders ({} override files applied)",
        staged.staged, staged.overrides
    );
    for missing in &staged.missing {
        println!("  Nothing downloaded for fileset: {}", missing);
    }
    Ok(())
}
