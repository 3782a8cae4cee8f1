//! Fetch phase: pull the fileset catalog and listed assets from a content host

use crate::context::{RunContext, FILESET_INDEX_FILE};
use crate::error::{PipelineError, PipelineResult};
use coa_core::layout::purge_dir;
use coa_core::CoreError;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Where SQL and CSV assets come from
pub trait ContentHost {
    /// Copy `remote` (a path relative to the host root) to `dest`
    fn fetch(&self, remote: &str, dest: &Path) -> PipelineResult<()>;

    /// Human-readable location for logging
    fn describe(&self) -> String;
}

/// A content host on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalContentHost {
    root: PathBuf,
}

impl LocalContentHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Parse a `content_host` setting: a folder path or a `file://` URL
    pub fn from_location(location: &str) -> PipelineResult<Self> {
        let location = location.trim();
        if let Some(path) = location.strip_prefix("file://") {
            return Ok(Self::new(path));
        }
        if location.is_empty() || location.contains("://") {
            return Err(PipelineError::UnsupportedContentHost {
                location: location.to_string(),
            });
        }
        Ok(Self::new(location))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentHost for LocalContentHost {
    fn fetch(&self, remote: &str, dest: &Path) -> PipelineResult<()> {
        let src = self.root.join(remote.trim_start_matches(['/', '\\']));
        if !src.is_file() {
            return Err(PipelineError::FetchFailed {
                host: self.describe(),
                remote: remote.to_string(),
                message: "not found".to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io_at(parent, e))?;
        }
        fs::copy(&src, dest).map_err(|e| PipelineError::FetchFailed {
            host: self.describe(),
            remote: remote.to_string(),
            message: e.to_string(),
        })?;
        log::debug!("  fetched {} -> {}", remote, dest.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("local content host {}", self.root.display())
    }
}

/// Counts reported by [`fetch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub filesets: usize,
    pub files: usize,
    pub missing: Vec<String>,
    pub skipped: bool,
}

/// Fetch the catalog and every file of every resolved fileset.
///
/// The download folder is emptied first. Files land in
/// `download/<fileset>/<basename>`. A listed file the host does not have is
/// reported and skipped; a missing catalog is an error.
pub fn fetch(ctx: &mut RunContext, host: &dyn ContentHost) -> PipelineResult<FetchSummary> {
    if ctx.config.settings.skip_fetch {
        log::info!("skip_fetch is set, using the existing download folder");
        return Ok(FetchSummary {
            skipped: true,
            ..FetchSummary::default()
        });
    }

    log::info!("fetching from {}", host.describe());
    let download = ctx.workdir.download_dir();
    purge_dir(&download)?;

    let index = ctx.config.settings.fileset_index.clone();
    host.fetch(&index, &download.join(FILESET_INDEX_FILE))?;
    ctx.reload_catalog()?;

    let mut summary = FetchSummary::default();
    let resolution = ctx.resolution();
    let mut fetched = BTreeSet::new();
    for target in &resolution.targets {
        if !fetched.insert(target.fileset_name.clone()) {
            continue;
        }
        summary.filesets += 1;
        log::info!("fileset {}: {} files", target.fileset_name, target.files().len());

        let folder = download.join(target.fileset_name.as_str());
        for (remote, name) in target.files().iter().zip(target.fileset.file_names()) {
            match host.fetch(remote, &folder.join(name)) {
                Ok(()) => summary.files += 1,
                Err(PipelineError::FetchFailed { message, .. }) => {
                    log::warn!("  could not fetch {}: {}", remote, message);
                    summary.missing.push(remote.clone());
                }
                Err(e) => return Err(e),
            }
        }
    }

    log::info!(
        "fetch done: {} files in {} filesets ({} missing)",
        summary.files,
        summary.filesets,
        summary.missing.len()
    );
    Ok(summary)
}
