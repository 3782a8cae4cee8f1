//! Fileset resolution: which filesets run on which systems

use crate::config::Config;
use crate::fileset::{Fileset, FilesetCatalog};
use crate::names::{FilesetName, SystemName};
use crate::scope::ScopeStack;
use crate::system::{FilesetBinding, SourceSystem};
use std::collections::BTreeMap;
use std::fmt;

/// Why a system's fileset binding was not resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The system's binding is switched off
    BindingInactive,
    /// The binding names a fileset missing from the catalog
    UnknownFileset,
    /// The catalog fileset is switched off
    FilesetInactive,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BindingInactive => write!(f, "binding is inactive"),
            SkipReason::UnknownFileset => write!(f, "fileset not found in catalog"),
            SkipReason::FilesetInactive => write!(f, "fileset is inactive"),
        }
    }
}

/// One `(system, fileset)` pair that will be prepared and executed
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTarget<'a> {
    pub system_name: &'a SystemName,
    pub system: &'a SourceSystem,
    pub fileset_name: &'a FilesetName,
    pub fileset: &'a Fileset,
    pub binding: &'a FilesetBinding,
}

impl<'a> ResolvedTarget<'a> {
    /// Ordered file references from the catalog fileset
    pub fn files(&self) -> &'a [String] {
        &self.fileset.files
    }

    /// Every substitution scope for this target, in precedence order
    pub fn scope_stack(&self, config: &Config) -> ScopeStack {
        ScopeStack::new()
            .with(self.binding.scope())
            .with(self.system.scope())
            .with(config.global_scope())
            .with(config.reporting_scope())
            .with(self.fileset.scope())
    }
}

/// A binding that was skipped, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBinding {
    pub system: SystemName,
    pub fileset: FilesetName,
    pub reason: SkipReason,
}

/// Result of resolving systems against the catalog
#[derive(Debug, Clone, Default)]
pub struct Resolution<'a> {
    /// Targets in system-name order, then binding order
    pub targets: Vec<ResolvedTarget<'a>>,
    /// Bindings that will not run
    pub skipped: Vec<SkippedBinding>,
    /// Systems that are switched off
    pub inactive_systems: Vec<SystemName>,
}

impl<'a> Resolution<'a> {
    /// Targets belonging to one system
    pub fn for_system(&self, system: &str) -> impl Iterator<Item = &ResolvedTarget<'a>> + '_ {
        let system = system.to_string();
        self.targets
            .iter()
            .filter(move |t| t.system_name.as_str() == system)
    }
}

/// Resolve every active system's bindings against `catalog`
pub fn resolve<'a>(
    systems: &'a BTreeMap<SystemName, SourceSystem>,
    catalog: &'a FilesetCatalog,
) -> Resolution<'a> {
    let mut resolution = Resolution::default();

    for (system_name, system) in systems {
        if !system.active {
            log::info!("system '{}' is inactive, skipping", system_name);
            resolution.inactive_systems.push(system_name.clone());
            continue;
        }

        for (fileset_name, binding) in &system.filesets {
            let reason = if !binding.active {
                Some(SkipReason::BindingInactive)
            } else {
                match catalog.get(fileset_name) {
                    None => Some(SkipReason::UnknownFileset),
                    Some(fileset) if !fileset.active => Some(SkipReason::FilesetInactive),
                    Some(fileset) => {
                        resolution.targets.push(ResolvedTarget {
                            system_name,
                            system,
                            fileset_name,
                            fileset,
                            binding,
                        });
                        None
                    }
                }
            };

            if let Some(reason) = reason {
                if reason == SkipReason::BindingInactive {
                    log::info!("{}/{}: {}, skipping", system_name, fileset_name, reason);
                } else {
                    log::warn!("{}/{}: {}, skipping", system_name, fileset_name, reason);
                }
                resolution.skipped.push(SkippedBinding {
                    system: system_name.clone(),
                    fileset: fileset_name.clone(),
                    reason,
                });
            }
        }
    }

    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;
    use crate::secrets::Secrets;

    const CONFIG: &str = r#"
substitutions:
  startdate: "global"
systems:
  beta:
    filesets:
      demo: { active: true }
      ghost: { active: true }
  alpha:
    filesets:
      demo: { active: true, startdate: "override" }
      retired: { active: true }
      dbql: { active: false }
  off:
    active: false
    filesets:
      demo: { active: true }
"#;

    const CATALOG: &str = r#"
demo:
  startdate: "fileset"
  files: ["demo/a.coa.sql", "demo/b.csv"]
retired:
  active: false
  files: []
dbql:
  files: ["dbql/x.coa.sql"]
"#;

    fn load() -> (Config, FilesetCatalog) {
        (
            Config::parse(CONFIG, &Secrets::default()).unwrap(),
            FilesetCatalog::parse(CATALOG, &Secrets::default()).unwrap(),
        )
    }

    #[test]
    fn test_resolve_targets_in_name_order() {
        let (config, catalog) = load();
        let resolution = resolve(&config.systems, &catalog);

        let pairs: Vec<(&str, &str)> = resolution
            .targets
            .iter()
            .map(|t| (t.system_name.as_str(), t.fileset_name.as_str()))
            .collect();
        assert_eq!(pairs, vec![("alpha", "demo"), ("beta", "demo")]);
        assert_eq!(resolution.targets[0].files().len(), 2);
    }

    #[test]
    fn test_resolve_skip_reasons() {
        let (config, catalog) = load();
        let resolution = resolve(&config.systems, &catalog);

        let reasons: Vec<(&str, &str, SkipReason)> = resolution
            .skipped
            .iter()
            .map(|s| (s.system.as_str(), s.fileset.as_str(), s.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("alpha", "dbql", SkipReason::BindingInactive),
                ("alpha", "retired", SkipReason::FilesetInactive),
                ("beta", "ghost", SkipReason::UnknownFileset),
            ]
        );
        assert_eq!(resolution.inactive_systems, vec![SystemName::new("off")]);
    }

    #[test]
    fn test_scope_stack_precedence() {
        let (config, catalog) = load();
        let resolution = resolve(&config.systems, &catalog);
        let alpha = resolution.for_system("alpha").next().unwrap();
        let beta = resolution.for_system("beta").next().unwrap();

        let stack = alpha.scope_stack(&config);
        let kinds: Vec<ScopeKind> = stack.scopes().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ScopeKind::SystemFileset,
                ScopeKind::System,
                ScopeKind::Global,
                ScopeKind::Reporting,
                ScopeKind::Fileset,
            ]
        );
        assert_eq!(stack.apply("{startdate}"), "override");
        assert_eq!(beta.scope_stack(&config).apply("{startdate}"), "global");
    }
}
