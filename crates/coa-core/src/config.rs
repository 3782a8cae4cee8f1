//! Collector configuration (`config.yaml`)
//!
//! The document is loaded in two passes over its YAML tree. Secrets are
//! substituted into every string value first; then the document's own
//! `substitutions`, `folders`, `settings` and `reporting` mappings are
//! substituted into it, so one value can refer to another with `{name}`.

use crate::error::{CoreError, CoreResult};
use crate::names::SystemName;
use crate::scope::{substitute_value, ScopeKind, SubstitutionScope};
use crate::secrets::Secrets;
use crate::serde_helpers::{default_true, deserialize_flag, mapping_entries};
use crate::system::{ConnectionSpec, DriverKind, SourceSystem};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Sections whose values may be referenced from elsewhere in the document
const SELF_SUBSTITUTION_SECTIONS: [&str; 4] = ["substitutions", "folders", "settings", "reporting"];

/// Keys of the reporting section that identify the connection and are never
/// substituted into templates
pub const REPORTING_CONNECTION_KEYS: [&str; 6] =
    ["host", "username", "password", "logmech", "driver", "encryption"];

/// Main collector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Global substitution keys
    #[serde(default)]
    pub substitutions: Mapping,

    /// Source systems by name
    #[serde(default)]
    pub systems: BTreeMap<SystemName, SourceSystem>,

    /// Reporting database connection and database names
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Working-directory folder names
    #[serde(default)]
    pub folders: Folders,

    /// Run behaviour switches
    #[serde(default)]
    pub settings: Settings,
}

/// Working-directory folder names, relative to the working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folders {
    /// Local overrides applied over the staged SQL store
    #[serde(rename = "override", default = "default_override_folder")]
    pub overrides: String,

    /// Raw files fetched from the content host
    #[serde(default = "default_download_folder")]
    pub download: String,

    /// Per-system SQL store
    #[serde(default = "default_sql_folder")]
    pub sql: String,

    /// Prepared SQL, ready to run
    #[serde(default = "default_run_folder")]
    pub run: String,

    /// Timestamped result folders
    #[serde(default = "default_output_folder")]
    pub output: String,
}

fn default_override_folder() -> String {
    "0_override".to_string()
}

fn default_download_folder() -> String {
    "1_download".to_string()
}

fn default_sql_folder() -> String {
    "2_sql_store".to_string()
}

fn default_run_folder() -> String {
    "3_ready_to_run".to_string()
}

fn default_output_folder() -> String {
    "4_output".to_string()
}

impl Default for Folders {
    fn default() -> Self {
        Self {
            overrides: default_override_folder(),
            download: default_download_folder(),
            sql: default_sql_folder(),
            run: default_run_folder(),
            output: default_output_folder(),
        }
    }
}

/// Run behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Content host root (local directory or `file://` URL)
    #[serde(default)]
    pub content_host: String,

    /// Fileset index path on the content host
    #[serde(default = "default_fileset_index")]
    pub fileset_index: String,

    /// Do not fetch from the content host
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub skip_fetch: bool,

    /// Emulate every database connection
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub skip_db: bool,

    /// Also prepare and execute SQL folders that are not catalog filesets
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub run_non_fileset_folders: bool,

    /// Driver used when a system does not name one
    #[serde(default)]
    pub driver_kind: DriverKind,

    /// Rows per INSERT statement when materialising a CSV
    #[serde(default = "default_temp_chunk_rows")]
    pub temp_chunk_rows: usize,
}

fn default_fileset_index() -> String {
    "filesets.yaml".to_string()
}

fn default_temp_chunk_rows() -> usize {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            content_host: String::new(),
            fileset_index: default_fileset_index(),
            skip_fetch: false,
            skip_db: false,
            run_non_fileset_folders: true,
            driver_kind: DriverKind::default(),
            temp_chunk_rows: default_temp_chunk_rows(),
        }
    }
}

/// Reporting database: connection identity plus free-form database names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub logmech: String,

    /// Driver override (defaults to `settings.driver_kind`)
    #[serde(default)]
    pub driver: Option<DriverKind>,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub encryption: bool,

    /// Database names such as `db_coa` and `db_stg`
    #[serde(flatten)]
    pub names: Mapping,
}

impl ReportingConfig {
    /// Connection parameters, falling back to `default_driver`
    pub fn connection(&self, default_driver: DriverKind) -> ConnectionSpec {
        ConnectionSpec {
            host: self.host.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            logmech: self.logmech.clone(),
            driver: self.driver.unwrap_or(default_driver),
            encryption: self.encryption,
        }
    }

    /// Look up a database name such as `db_stg`
    pub fn name(&self, key: &str) -> Option<String> {
        self.names
            .get(key)
            .map(crate::serde_helpers::yaml_to_string)
            .filter(|v| !v.is_empty())
    }

    /// Default schema for upload targets without one
    pub fn staging_schema(&self) -> Option<String> {
        self.name("db_stg")
    }
}

impl Config {
    /// Load configuration from a file, substituting `secrets` first
    pub fn load(path: &Path, secrets: &Secrets) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io_at(path, e))?;
        Self::parse(&content, secrets)
    }

    /// Parse configuration text with the two-pass substitution
    pub fn parse(content: &str, secrets: &Secrets) -> CoreResult<Self> {
        let mut doc: Value = serde_yaml::from_str(content).map_err(|e| parse_error("config", e))?;
        if doc.is_null() {
            doc = Value::Mapping(Mapping::new());
        }

        log::debug!("substituting secrets into config");
        substitute_value(&mut doc, secrets.entries(), &[]);

        let own = self_substitutions(&doc);
        log::debug!("substituting config into itself ({} keys)", own.len());
        substitute_value(&mut doc, &own, &[]);

        let config: Config = serde_yaml::from_value(doc).map_err(|e| parse_error("config", e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.settings.temp_chunk_rows == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "settings.temp_chunk_rows must be greater than zero".to_string(),
            });
        }
        for (name, folder) in [
            ("override", &self.folders.overrides),
            ("download", &self.folders.download),
            ("sql", &self.folders.sql),
            ("run", &self.folders.run),
            ("output", &self.folders.output),
        ] {
            if folder.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("folders.{} must not be empty", name),
                });
            }
        }
        if !self.settings.skip_db {
            self.validate_drivers()?;
        }
        Ok(())
    }

    /// Only DuckDB has a working backend; reject other drivers up front
    /// rather than at connect time.
    fn validate_drivers(&self) -> CoreResult<()> {
        let unavailable = |driver: DriverKind, owner: String| CoreError::ConfigInvalid {
            message: format!(
                "driver '{}' for {} is not available in this build; use duckdb or set settings.skip_db",
                driver, owner
            ),
        };
        for (name, system) in self.systems.iter().filter(|(_, s)| s.active) {
            let driver = self.system_connection(system).driver;
            if driver != DriverKind::DuckDb {
                return Err(unavailable(driver, format!("system '{}'", name)));
            }
        }
        let driver = self.reporting_connection().driver;
        if driver != DriverKind::DuckDb {
            return Err(unavailable(driver, "reporting".to_string()));
        }
        Ok(())
    }

    /// Look up a source system by name
    pub fn system(&self, name: &str) -> Option<&SourceSystem> {
        self.systems.get(name)
    }

    /// Driver used for `system`, honouring the settings default
    pub fn system_connection(&self, system: &SourceSystem) -> ConnectionSpec {
        system.connection(self.settings.driver_kind)
    }

    /// Connection parameters for the reporting database
    pub fn reporting_connection(&self) -> ConnectionSpec {
        self.reporting.connection(self.settings.driver_kind)
    }

    /// The global `substitutions` scope
    pub fn global_scope(&self) -> SubstitutionScope {
        SubstitutionScope::from_mapping(ScopeKind::Global, &self.substitutions)
    }

    /// Reporting database names, with connection identity excluded
    pub fn reporting_scope(&self) -> SubstitutionScope {
        SubstitutionScope::from_mapping(ScopeKind::Reporting, &self.reporting.names)
            .skipping(&REPORTING_CONNECTION_KEYS)
    }
}

fn self_substitutions(doc: &Value) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for section in SELF_SUBSTITUTION_SECTIONS {
        if let Some(Value::Mapping(map)) = doc.get(section) {
            // nested collections render as multi-line YAML; not usable as tokens
            entries.extend(
                mapping_entries(map)
                    .into_iter()
                    .filter(|(_, v)| !v.contains('\n')),
            );
        }
    }
    entries
}

pub(crate) fn parse_error(document: &str, err: serde_yaml::Error) -> CoreError {
    CoreError::ConfigParseError {
        document: document.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
