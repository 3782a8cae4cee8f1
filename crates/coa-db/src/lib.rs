//! coa-db - Database abstraction layer for the COA collector
//!
//! This crate provides the `Database` trait, the tabular `ResultSet`
//! returned by statements, and the backends: DuckDB, a Teradata stub, and a
//! null backend that emulates a connection when database access is switched
//! off.

pub mod duckdb;
pub mod error;
pub mod null;
pub mod result;
pub(crate) mod teradata;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use null::NullBackend;
pub use result::ResultSet;
pub use traits::{connect, returns_rows, Database};
