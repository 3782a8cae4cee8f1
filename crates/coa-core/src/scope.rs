//! Substitution scopes and the single-pass substitution resolver
//!
//! A template token `{name}` is replaced by the value bound to `name` in a
//! scope. Scopes are applied one after another in precedence order, highest
//! first, so a key bound in a higher scope shadows the same key in every
//! lower scope: once `{name}` has been replaced, lower scopes no longer see
//! it.

use serde_yaml::Value;
use std::fmt;

/// Replace every `{name}` in `text` with its value, in one pass over `mapping`.
///
/// Keys listed in `skip_keys` are left untouched. Text produced by an earlier
/// replacement is not rescanned for the same key, and keys that never occur
/// are ignored.
pub fn substitute<K, V>(text: &str, mapping: &[(K, V)], skip_keys: &[&str]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = text.to_string();
    for (name, value) in mapping {
        let name = name.as_ref();
        if skip_keys.contains(&name) {
            continue;
        }
        let token = format!("{{{}}}", name);
        if out.contains(&token) {
            out = out.replace(&token, value.as_ref());
            log::debug!("  {} -> {}", token, value.as_ref());
        }
    }
    out
}

/// Apply [`substitute`] to every string leaf of a YAML tree.
///
/// Mapping keys are left alone; only values are rewritten.
pub fn substitute_value<K, V>(value: &mut Value, mapping: &[(K, V)], skip_keys: &[&str])
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    match value {
        Value::String(s) => {
            if s.contains('{') {
                *s = substitute(s, mapping, skip_keys);
            }
        }
        Value::Sequence(items) => {
            for item in items {
                substitute_value(item, mapping, skip_keys);
            }
        }
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, mapping, skip_keys);
            }
        }
        Value::Tagged(tagged) => substitute_value(&mut tagged.value, mapping, skip_keys),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// The named substitution scopes, in precedence order (highest first).
///
/// `Secrets` is an auxiliary pre-pass applied to the configuration documents
/// themselves; it never takes part in template preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKind {
    /// Per-system override of a fileset's keys
    SystemFileset,
    /// Keys defined on the source system itself
    System,
    /// The config document's `substitutions` mapping
    Global,
    /// Reporting-database names (connection identity excluded)
    Reporting,
    /// Keys defined on the fileset in the catalog
    Fileset,
    /// Secret values, applied to documents before parsing
    Secrets,
}

impl ScopeKind {
    /// Human-readable label used in the run log
    pub fn label(self) -> &'static str {
        match self {
            ScopeKind::SystemFileset => "system-fileset overrides (highest priority)",
            ScopeKind::System => "system defaults",
            ScopeKind::Global => "global substitutions",
            ScopeKind::Reporting => "reporting database names",
            ScopeKind::Fileset => "fileset defaults (lowest priority)",
            ScopeKind::Secrets => "secrets",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One named mapping of substitution keys to values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionScope {
    /// Which scope this is (determines precedence)
    pub kind: ScopeKind,

    /// Ordered `(key, value)` pairs
    pub entries: Vec<(String, String)>,

    /// Keys present in `entries` that must not be substituted
    pub skip_keys: Vec<String>,
}

impl SubstitutionScope {
    /// Create a scope with no skip keys
    pub fn new(kind: ScopeKind, entries: Vec<(String, String)>) -> Self {
        Self {
            kind,
            entries,
            skip_keys: Vec::new(),
        }
    }

    /// Build a scope from a YAML mapping, keeping document order
    pub fn from_mapping(kind: ScopeKind, mapping: &serde_yaml::Mapping) -> Self {
        Self::new(kind, crate::serde_helpers::mapping_entries(mapping))
    }

    /// Add keys that this scope must leave in place
    pub fn skipping(mut self, keys: &[&str]) -> Self {
        self.skip_keys.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Look up the value bound to `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Apply this scope to `text`
    pub fn apply(&self, text: &str) -> String {
        log::debug!("performing substitution: {}", self.kind);
        let skip: Vec<&str> = self.skip_keys.iter().map(String::as_str).collect();
        substitute(text, &self.entries, &skip)
    }
}

/// Ordered list of scopes applied highest precedence first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeStack {
    scopes: Vec<SubstitutionScope>,
}

impl ScopeStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scope at its precedence position.
    ///
    /// Scopes of equal kind keep insertion order.
    pub fn push(&mut self, scope: SubstitutionScope) {
        let pos = self
            .scopes
            .iter()
            .position(|s| s.kind > scope.kind)
            .unwrap_or(self.scopes.len());
        self.scopes.insert(pos, scope);
    }

    /// Builder-style [`push`](Self::push)
    pub fn with(mut self, scope: SubstitutionScope) -> Self {
        self.push(scope);
        self
    }

    /// Scopes in the order they will be applied
    pub fn scopes(&self) -> &[SubstitutionScope] {
        &self.scopes
    }

    /// Apply every scope to `text`, highest precedence first
    pub fn apply(&self, text: &str) -> String {
        self.scopes
            .iter()
            .fold(text.to_string(), |acc, scope| scope.apply(&acc))
    }
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod tests;
