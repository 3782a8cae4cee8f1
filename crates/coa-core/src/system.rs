//! Source systems: database endpoints that prepared SQL runs against

use crate::names::FilesetName;
use crate::scope::{ScopeKind, SubstitutionScope};
use crate::serde_helpers::{default_true, deserialize_flag, mapping_entries};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Database driver kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// DuckDB (file path or `:memory:` in `host`)
    #[default]
    DuckDb,
    /// Teradata Vantage
    #[serde(alias = "sqlalchemy", alias = "teradataml", alias = "odbc")]
    Teradata,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::DuckDb => write!(f, "duckdb"),
            DriverKind::Teradata => write!(f, "teradata"),
        }
    }
}

/// Everything a driver needs to open a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    /// Host name, or database path for file-based drivers
    pub host: String,
    /// Login user
    pub username: String,
    /// Login password
    pub password: String,
    /// Authentication mechanism (e.g. `LDAP`, `TD2`)
    pub logmech: String,
    /// Driver used to connect
    pub driver: DriverKind,
    /// Request an encrypted session
    pub encryption: bool,
}

/// Per-system override of a catalog fileset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesetBinding {
    /// Whether this system runs the fileset
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub active: bool,

    /// Substitution keys overriding the fileset's defaults
    #[serde(flatten)]
    pub overrides: serde_yaml::Mapping,
}

impl FilesetBinding {
    /// Highest-precedence scope: this binding's override keys
    pub fn scope(&self) -> SubstitutionScope {
        SubstitutionScope::new(ScopeKind::SystemFileset, mapping_entries(&self.overrides))
    }
}

/// A database endpoint with its fileset bindings and substitution keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSystem {
    /// Whether this system takes part in the run
    #[serde(default = "default_true", deserialize_with = "deserialize_flag")]
    pub active: bool,

    /// Site identifier reported with every result
    #[serde(default, alias = "siteid")]
    pub site_id: String,

    /// Host name, or database path for file-based drivers
    #[serde(default)]
    pub host: String,

    /// Login user
    #[serde(default)]
    pub username: String,

    /// Login password
    #[serde(default)]
    pub password: String,

    /// Authentication mechanism
    #[serde(default)]
    pub logmech: String,

    /// Driver override (defaults to `settings.driver_kind`)
    #[serde(default)]
    pub driver: Option<DriverKind>,

    /// Request an encrypted session
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub encryption: bool,

    /// Fileset bindings for this system
    #[serde(default)]
    pub filesets: BTreeMap<FilesetName, FilesetBinding>,

    /// All other keys, used for substitution
    #[serde(flatten)]
    pub vars: serde_yaml::Mapping,
}

impl SourceSystem {
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

    /// The system-defaults scope.
    ///
    /// Exposes the system's own attributes under their document names
    /// (`siteid`, `host`, ...) followed by the free-form keys. The
    /// `filesets` key is never substituted.
    pub fn scope(&self) -> SubstitutionScope {
        let mut entries = vec![
            ("active".to_string(), self.active.to_string()),
            ("siteid".to_string(), self.site_id.clone()),
            ("host".to_string(), self.host.clone()),
            ("username".to_string(), self.username.clone()),
            ("password".to_string(), self.password.clone()),
            ("logmech".to_string(), self.logmech.clone()),
            ("encryption".to_string(), self.encryption.to_string()),
        ];
        if let Some(driver) = self.driver {
            entries.push(("driver".to_string(), driver.to_string()));
        }
        entries.extend(mapping_entries(&self.vars));
        SubstitutionScope::new(ScopeKind::System, entries).skipping(&["filesets"])
    }

    /// Binding for `fileset`, if this system declares one
    pub fn binding(&self, fileset: &str) -> Option<&FilesetBinding> {
        self.filesets.get(fileset)
    }
}
