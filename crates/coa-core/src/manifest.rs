//! Upload manifest and result-file naming
//!
//! Each `<system>/<fileset>` output folder gets one `upload-manifest.json`
//! listing the result CSVs the upload phase appends to the reporting
//! database, with an optional procedure to call after each load.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest file name inside an output folder
pub const MANIFEST_FILE: &str = "upload-manifest.json";

/// Highest collision suffix (`.999`) tried before giving up
pub const MAX_SAVE_SUFFIX: u32 = 999;

/// One upload step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Result CSV, relative to the manifest's folder
    pub file: String,
    /// Target table, `schema.table` or bare `table`
    pub table: String,
    /// Procedure to call after the load (empty for none)
    #[serde(default)]
    pub call: String,
}

/// Ordered upload steps for one output folder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadManifest {
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl UploadManifest {
    /// Path of the manifest inside `folder`
    pub fn path_in(folder: &Path) -> PathBuf {
        folder.join(MANIFEST_FILE)
    }

    /// Load the manifest stored in `folder`
    pub fn load(folder: &Path) -> CoreResult<Self> {
        let path = Self::path_in(folder);
        let content = fs::read_to_string(&path).map_err(|e| CoreError::io_at(&path, e))?;
        let manifest: UploadManifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Write the manifest into `folder`
    ///
    /// Uses write-to-temp-then-rename so a partially written manifest is
    /// never picked up by the upload phase.
    pub fn save(&self, folder: &Path) -> CoreResult<()> {
        let path = Self::path_in(folder);
        let content = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| CoreError::io_at(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| CoreError::io_at(&path, e))?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names result files and collects manifest entries for one output folder
#[derive(Debug)]
pub struct ManifestBuilder {
    folder: PathBuf,
    prefix: String,
    entries: Vec<ManifestEntry>,
    used: HashSet<String>,
}

impl ManifestBuilder {
    /// Builder for `<system>/<fileset>` results written into `folder`
    pub fn new(folder: impl Into<PathBuf>, system: &str, fileset: &str) -> Self {
        Self {
            folder: folder.into(),
            prefix: format!("{}.{}", system, fileset),
            entries: Vec::new(),
            used: HashSet::new(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// `<system>.<fileset>--<file><NNNN>.csv`
    pub fn default_save_name(&self, file: &str, seq: usize) -> String {
        format!("{}--{}{:04}.csv", self.prefix, file, seq)
    }

    /// Choose the on-disk name for a result.
    ///
    /// `requested` is the statement's `save` value; without one a default
    /// name is derived from `file` and the statement sequence `seq`. A name
    /// that already exists in the folder, or was handed out earlier, gets a
    /// `.NNN` suffix before its extension.
    pub fn reserve(&mut self, requested: Option<&str>, file: &str, seq: usize) -> CoreResult<String> {
        let base = match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => name.to_string(),
            None => self.default_save_name(file, seq),
        };

        let name = if self.is_free(&base) {
            base
        } else {
            let (stem, ext) = split_extension(&base);
            (1..=MAX_SAVE_SUFFIX)
                .map(|i| format!("{}.{:03}{}", stem, i, ext))
                .find(|candidate| self.is_free(candidate))
                .ok_or_else(|| CoreError::SaveNameExhausted {
                    name: base.clone(),
                    limit: MAX_SAVE_SUFFIX,
                })?
        };

        self.used.insert(name.clone());
        Ok(name)
    }

    fn is_free(&self, name: &str) -> bool {
        !self.used.contains(name) && !self.folder.join(name).exists()
    }

    /// Full path for a reserved name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }

    /// Record a saved result. Only results with a `load` target produce an
    /// entry.
    pub fn record(&mut self, file: &str, load: Option<&str>, call: Option<&str>) -> bool {
        let Some(table) = load.map(str::trim).filter(|t| !t.is_empty()) else {
            return false;
        };
        let entry = ManifestEntry {
            file: file.to_string(),
            table: table.to_string(),
            call: call.map(str::trim).unwrap_or_default().to_string(),
        };
        log::info!(
            "manifest entry: file={} table={} call={}",
            entry.file,
            entry.table,
            entry.call
        );
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Persist the manifest and return it
    pub fn finish(self) -> CoreResult<UploadManifest> {
        let manifest = UploadManifest {
            entries: self.entries,
        };
        fs::create_dir_all(&self.folder).map_err(|e| CoreError::io_at(&self.folder, e))?;
        manifest.save(&self.folder)?;
        Ok(manifest)
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod tests;
