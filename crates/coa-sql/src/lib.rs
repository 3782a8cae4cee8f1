//! coa-sql - SQL text layer for the COA collector
//!
//! This crate works on SQL template text only: it extracts inline
//! `/*{{key:value}}*/` directives, splits and normalises statements, and
//! transcribes CSV files into volatile-table DDL and chunked INSERTs. It has
//! no knowledge of systems, filesets or databases.

pub mod csv_table;
pub mod directive;
pub mod error;
pub mod format;
pub mod transcribe;

pub use csv_table::CsvTable;
pub use directive::{extract, Directive, DirectiveKey, Extraction};
pub use error::{SqlError, SqlResult};
pub use format::{format_fragment, format_statement, has_sql_content, split_and_format};
pub use transcribe::{transcribe, ColumnType, VolatileTable};
