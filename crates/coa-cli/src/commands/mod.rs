//! CLI command implementations

pub(crate) mod archive;
pub(crate) mod common;
pub(crate) mod execute;
pub(crate) mod fetch;
pub(crate) mod prepare;
pub(crate) mod run;
pub(crate) mod upload;
