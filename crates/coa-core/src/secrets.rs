//! Secrets document
//!
//! `secrets.yaml` holds free-form key/value pairs under a top-level
//! `secrets:` key. Secret values are substituted into the other documents
//! before they are parsed, and are masked in every run-log line.

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::yaml_to_string;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    secrets: serde_yaml::Mapping,
}

/// Loaded secret values, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    entries: Vec<(String, String)>,
}

impl Secrets {
    /// Build secrets from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse secrets from YAML text
    pub fn parse(content: &str) -> CoreResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: SecretsFile =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                document: "secrets".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            entries: file
                .secrets
                .iter()
                .map(|(k, v)| (yaml_to_string(k), yaml_to_string(v)))
                .collect(),
        })
    }

    /// Load secrets from a file. A missing file yields no secrets.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            log::warn!("secrets file not found, continuing without secrets: {}", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::io_at(path, e))?;
        Self::parse(&content)
    }

    /// Ordered `(name, value)` pairs for substitution
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Non-empty secret values, for log redaction
    pub fn values(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(_, v)| v.clone())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Whether any secrets were loaded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
