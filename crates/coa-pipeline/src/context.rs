//! Run context: everything one run needs, passed explicitly to each phase

use crate::error::PipelineResult;
use coa_core::{resolve, Config, FilesetCatalog, Resolution, Secrets, WorkingDir};
use std::path::{Path, PathBuf};

/// Default configuration document name at the working-directory root
pub const CONFIG_FILE: &str = "config.yaml";

/// Default secrets document name at the working-directory root
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Fileset catalog name inside the download folder
pub const FILESET_INDEX_FILE: &str = "filesets.yaml";

/// Working directory, configuration, secrets and fileset catalog of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub workdir: WorkingDir,
    pub config: Config,
    pub secrets: Secrets,
    pub catalog: FilesetCatalog,
    /// Where the configuration was read from (copied next to run output)
    pub config_path: PathBuf,
}

impl RunContext {
    pub fn new(workdir: WorkingDir, config: Config, secrets: Secrets, catalog: FilesetCatalog) -> Self {
        let config_path = workdir.root().join(CONFIG_FILE);
        Self {
            workdir,
            config,
            secrets,
            catalog,
            config_path,
        }
    }

    /// Load a run context rooted at `root`.
    ///
    /// Secrets are read first so they can be substituted into the config.
    /// The working folders are created when missing. A catalog that has not
    /// been fetched yet loads as empty.
    pub fn load(
        root: &Path,
        config_path: Option<&Path>,
        secrets_path: Option<&Path>,
    ) -> PipelineResult<Self> {
        let secrets = Secrets::load(&Self::secrets_path(root, secrets_path))?;
        Self::load_with_secrets(root, config_path, secrets)
    }

    /// Where the secrets document is read from when `explicit` is not given
    pub fn secrets_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(SECRETS_FILE))
    }

    /// Like [`RunContext::load`], with secrets that were already read
    pub fn load_with_secrets(
        root: &Path,
        config_path: Option<&Path>,
        secrets: Secrets,
    ) -> PipelineResult<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(CONFIG_FILE));

        let config = Config::load(&config_path, &secrets)?;
        let workdir = WorkingDir::open(root, config.folders.clone())?;
        workdir.ensure_folders()?;

        let mut ctx = Self::new(workdir, config, secrets, FilesetCatalog::default());
        ctx.config_path = config_path;
        if ctx.catalog_path().exists() {
            ctx.reload_catalog()?;
        } else {
            log::warn!(
                "no fileset catalog at {} yet, run fetch first",
                ctx.catalog_path().display()
            );
        }
        Ok(ctx)
    }

    /// Location of the fetched fileset catalog
    pub fn catalog_path(&self) -> PathBuf {
        self.workdir.download_dir().join(FILESET_INDEX_FILE)
    }

    /// Re-read the fileset catalog from the download folder
    pub fn reload_catalog(&mut self) -> PipelineResult<()> {
        self.catalog = FilesetCatalog::load(&self.catalog_path(), &self.secrets)?;
        log::info!("fileset catalog loaded: {} filesets", self.catalog.len());
        Ok(())
    }

    /// Active (system, fileset) pairs for this run
    pub fn resolution(&self) -> Resolution<'_> {
        resolve(&self.config.systems, &self.catalog)
    }

    /// Rows per INSERT when materialising a CSV
    pub fn chunk_rows(&self) -> usize {
        self.config.settings.temp_chunk_rows
    }
}
