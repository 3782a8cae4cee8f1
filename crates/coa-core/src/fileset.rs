//! Fileset catalog (`filesets.yaml`)

use crate::config::parse_error;
use crate::error::{CoreError, CoreResult};
use crate::names::FilesetName;
use crate::scope::{substitute_value, ScopeKind, SubstitutionScope};
use crate::secrets::Secrets;
use crate::serde_helpers::{default_true, deserialize_flag, deserialize_opt_scalar, mapping_entries};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A named, versioned, ordered list of SQL/CSV assets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fileset {
    /// Whether the fileset may run at all
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub active: bool,

    /// Fileset version
    #[serde(
        default,
        alias = "fileset_version",
        deserialize_with = "deserialize_opt_scalar"
    )]
    pub version: Option<String>,

    /// File references relative to the content host, in run order
    #[serde(default)]
    pub files: Vec<String>,

    /// Default substitution keys
    #[serde(flatten)]
    pub defaults: Mapping,
}

impl Fileset {
    /// The lowest-precedence scope: the fileset's own defaults.
    ///
    /// The `files` list is never substituted.
    pub fn scope(&self) -> SubstitutionScope {
        let mut entries = vec![("active".to_string(), self.active.to_string())];
        if let Some(version) = &self.version {
            entries.push(("fileset_version".to_string(), version.clone()));
        }
        entries.extend(mapping_entries(&self.defaults));
        SubstitutionScope::new(ScopeKind::Fileset, entries).skipping(&["files"])
    }

    /// Basenames of the listed files, in order
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .map(|f| f.rsplit(['/', '\\']).next().unwrap_or(f.as_str()))
    }
}

/// All filesets known to the content host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilesetCatalog {
    filesets: BTreeMap<FilesetName, Fileset>,
}

impl FilesetCatalog {
    /// Build a catalog from explicit filesets
    pub fn from_filesets(filesets: BTreeMap<FilesetName, Fileset>) -> Self {
        Self { filesets }
    }

    /// Load the catalog, substituting `secrets` into it first
    pub fn load(path: &Path, secrets: &Secrets) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io_at(path, e))?;
        let catalog = Self::parse(&content, secrets)?;
        if catalog.is_empty() {
            return Err(CoreError::EmptyFilesetCatalog {
                path: path.display().to_string(),
            });
        }
        Ok(catalog)
    }

    /// Parse catalog text. Only secrets are substituted.
    pub fn parse(content: &str, secrets: &Secrets) -> CoreResult<Self> {
        let mut doc: Value =
            serde_yaml::from_str(content).map_err(|e| parse_error("filesets", e))?;
        if doc.is_null() {
            return Ok(Self::default());
        }
        substitute_value(&mut doc, secrets.entries(), &[]);
        serde_yaml::from_value(doc).map_err(|e| parse_error("filesets", e))
    }

    /// Look up a fileset by name
    pub fn get(&self, name: &str) -> Option<&Fileset> {
        self.filesets.get(name)
    }

    /// Whether `name` is a catalog fileset
    pub fn contains(&self, name: &str) -> bool {
        self.filesets.contains_key(name)
    }

    /// Filesets in name order
    pub fn iter(&self) -> impl Iterator<Item = (&FilesetName, &Fileset)> {
        self.filesets.iter()
    }

    pub fn len(&self) -> usize {
        self.filesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filesets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FILESETS_YAML: &str = r#"
demo:
  active: "True"
  fileset_version: 1.0
  startdate: "Current_Date - 7"
  token: "{api_token}"
  files:
    - "demo/0000.dates.csv"
    - "demo/0001.dbcinfo.coa.sql"
retired:
  active: false
  files: []
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = FilesetCatalog::parse(FILESETS_YAML, &Secrets::default()).unwrap();
        assert_eq!(catalog.len(), 2);

        let demo = catalog.get("demo").unwrap();
        assert!(demo.active);
        assert_eq!(demo.version.as_deref(), Some("1.0"));
        assert_eq!(demo.files.len(), 2);
        assert!(!catalog.get("retired").unwrap().active);
    }

    #[test]
    fn test_file_names_are_basenames() {
        let catalog = FilesetCatalog::parse(FILESETS_YAML, &Secrets::default()).unwrap();
        let names: Vec<&str> = catalog.get("demo").unwrap().file_names().collect();
        assert_eq!(names, vec!["0000.dates.csv", "0001.dbcinfo.coa.sql"]);
    }

    #[test]
    fn test_scope_skips_files() {
        let catalog = FilesetCatalog::parse(FILESETS_YAML, &Secrets::default()).unwrap();
        let scope = catalog.get("demo").unwrap().scope();
        assert_eq!(scope.kind, ScopeKind::Fileset);
        assert_eq!(scope.get("startdate"), Some("Current_Date - 7"));
        assert_eq!(scope.get("fileset_version"), Some("1.0"));
        assert_eq!(scope.get("files"), None);
        assert_eq!(scope.skip_keys, vec!["files".to_string()]);
    }

    #[test]
    fn test_secrets_substituted() {
        let secrets = Secrets::from_pairs([("api_token", "abc123")]);
        let catalog = FilesetCatalog::parse(FILESETS_YAML, &secrets).unwrap();
        let scope = catalog.get("demo").unwrap().scope();
        assert_eq!(scope.get("token"), Some("abc123"));
    }

    #[test]
    fn test_empty_catalog_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("filesets.yaml");
        std::fs::write(&path, "").unwrap();
        let err = FilesetCatalog::load(&path, &Secrets::default()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyFilesetCatalog { .. }));
    }
}
