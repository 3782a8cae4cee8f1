//! Working-directory layout
//!
//! ```text
//! <root>/
//!   config.yaml  secrets.yaml  .last_run_output_path.txt
//!   0_override/      local replacements for staged files
//!   1_download/      filesets.yaml + <fileset>/ as fetched
//!   2_sql_store/     <system>/<fileset>/ staged per system
//!   3_ready_to_run/  <system>/<fileset>/ prepared SQL
//!   4_output/        <YYYY-MM-DD_HHMMSS[-name]>/<system>/<fileset>/
//! ```

use crate::config::Folders;
use crate::error::{CoreError, CoreResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Hidden file at the root recording the most recent output folder
pub const LAST_RUN_FILE: &str = ".last_run_output_path.txt";

/// Marker suffix of SQL template files
pub const TEMPLATE_SUFFIX: &str = ".coa.sql";

/// Whether `name` is a SQL template file name
pub fn is_template(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(TEMPLATE_SUFFIX)
}

/// Replace every run of non-alphanumeric characters with `_`
pub fn sanitize_name(name: &str) -> String {
    static NON_ALNUM: OnceLock<regex::Regex> = OnceLock::new();
    NON_ALNUM
        .get_or_init(|| regex::Regex::new(r"[^0-9A-Za-z]+").expect("valid regex literal"))
        .replace_all(name, "_")
        .into_owned()
}

/// The folder tree one run owns
#[derive(Debug, Clone)]
pub struct WorkingDir {
    root: PathBuf,
    folders: Folders,
}

impl WorkingDir {
    /// Describe a working directory without touching the filesystem
    pub fn new(root: impl Into<PathBuf>, folders: Folders) -> Self {
        Self {
            root: root.into(),
            folders,
        }
    }

    /// Open an existing working directory
    pub fn open(root: impl Into<PathBuf>, folders: Folders) -> CoreResult<Self> {
        let dir = Self::new(root, folders);
        if !dir.root.is_dir() {
            return Err(CoreError::WorkingDirNotFound {
                path: dir.root.display().to_string(),
            });
        }
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn override_dir(&self) -> PathBuf {
        self.root.join(&self.folders.overrides)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.root.join(&self.folders.download)
    }

    pub fn sql_dir(&self) -> PathBuf {
        self.root.join(&self.folders.sql)
    }

    pub fn run_dir(&self) -> PathBuf {
        self.root.join(&self.folders.run)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.folders.output)
    }

    /// Create every working folder that is missing
    pub fn ensure_folders(&self) -> CoreResult<()> {
        for dir in [
            self.override_dir(),
            self.download_dir(),
            self.sql_dir(),
            self.run_dir(),
            self.output_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| CoreError::io_at(&dir, e))?;
        }
        Ok(())
    }

    /// Create a fresh timestamped folder under `output/`.
    ///
    /// The folder is named `YYYY-MM-DD_HHMMSS`, with `-<name>` appended when a
    /// non-empty run name is given.
    pub fn make_output_folder(&self, name: Option<&str>) -> CoreResult<PathBuf> {
        let mut folder = chrono::Local::now().format("%Y-%m-%d_%H%M%S").to_string();
        if let Some(name) = name.map(sanitize_name).filter(|n| !n.is_empty()) {
            folder.push('-');
            folder.push_str(&name);
        }

        let mut path = self.output_dir().join(&folder);
        let mut n = 1;
        while path.exists() {
            n += 1;
            path = self.output_dir().join(format!("{}.{}", folder, n));
        }
        fs::create_dir_all(&path).map_err(|e| CoreError::io_at(&path, e))?;
        log::info!("output folder: {}", path.display());
        Ok(path)
    }

    /// Record `output` as the most recent run's folder
    pub fn write_last_run(&self, output: &Path) -> CoreResult<()> {
        let relative = output.strip_prefix(&self.root).unwrap_or(output);
        let pointer = self.root.join(LAST_RUN_FILE);
        fs::write(&pointer, relative.display().to_string())
            .map_err(|e| CoreError::io_at(&pointer, e))
    }

    /// Read the most recent run's output folder
    pub fn read_last_run(&self) -> CoreResult<PathBuf> {
        let pointer = self.root.join(LAST_RUN_FILE);
        if !pointer.exists() {
            return Err(CoreError::NoLastRun {
                root: self.root.display().to_string(),
            });
        }
        let text = fs::read_to_string(&pointer).map_err(|e| CoreError::io_at(&pointer, e))?;
        let path = self.root.join(text.trim());
        if !path.is_dir() {
            return Err(CoreError::InvalidOutputFolder {
                path: path.display().to_string(),
            });
        }
        Ok(path)
    }
}

/// Delete everything inside `dir`, leaving it empty (created if missing)
pub fn purge_dir(dir: &Path) -> CoreResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| CoreError::io_at(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| CoreError::io_at(dir, e))
}

/// Recursively copy `src` into `dst`, replacing existing files
pub fn copy_tree(src: &Path, dst: &Path) -> CoreResult<()> {
    fs::create_dir_all(dst).map_err(|e| CoreError::io_at(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| CoreError::io_at(src, e))? {
        let entry = entry.map_err(|e| CoreError::io_at(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            fs::copy(&from, &to).map_err(|e| CoreError::io_at(&from, e))?;
        }
    }
    Ok(())
}

/// Move every entry of `src` into `dst`, merging folders that already exist
pub fn move_contents(src: &Path, dst: &Path) -> CoreResult<()> {
    fs::create_dir_all(dst).map_err(|e| CoreError::io_at(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| CoreError::io_at(src, e))? {
        let entry = entry.map_err(|e| CoreError::io_at(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() && to.is_dir() {
            move_contents(&from, &to)?;
            fs::remove_dir(&from).map_err(|e| CoreError::io_at(&from, e))?;
        } else {
            fs::rename(&from, &to).map_err(|e| CoreError::io_at(&from, e))?;
        }
    }
    Ok(())
}

/// Sorted child entries of `dir` (files or folders), skipping hidden ones
pub fn sorted_entries(dir: &Path, want_dirs: bool) -> CoreResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CoreError::io_at(dir, e))? {
        let path = entry.map_err(|e| CoreError::io_at(dir, e))?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if !hidden && path.is_dir() == want_dirs {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
