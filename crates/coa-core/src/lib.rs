//! coa-core - Core library for the COA collector
//!
//! This crate provides the shared types used by every collection phase:
//! configuration documents, secrets, the fileset catalog, substitution
//! scopes, fileset resolution, the working-directory layout, the run log and
//! upload manifests.

pub mod config;
pub mod error;
pub mod fileset;
pub mod layout;
pub mod manifest;
pub mod names;
pub mod resolve;
pub mod runlog;
pub mod scope;
pub mod secrets;
pub(crate) mod serde_helpers;
pub mod system;

pub use config::{Config, Folders, ReportingConfig, Settings};
pub use error::{CoreError, CoreResult};
pub use fileset::{Fileset, FilesetCatalog};
pub use layout::WorkingDir;
pub use manifest::{ManifestBuilder, ManifestEntry, UploadManifest};
pub use names::{FilesetName, SystemName};
pub use resolve::{resolve, Resolution, ResolvedTarget, SkipReason, SkippedBinding};
pub use runlog::{RunLog, RunLogHandle};
pub use scope::{substitute, ScopeKind, ScopeStack, SubstitutionScope};
pub use secrets::Secrets;
pub use system::{ConnectionSpec, DriverKind, FilesetBinding, SourceSystem};
