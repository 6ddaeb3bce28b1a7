//! Core library for schemadoc.
//!
//! Reads table and column metadata from a relational database catalog and
//! renders it as a Word (`.docx`) data dictionary: one section per table,
//! three descriptive paragraphs and a fixed 9-column grid.
//!
//! # Security Guarantees
//! - Catalog access is read-only and every query parameter is bound
//! - Passwords are zeroized on drop and never logged or printed
//! - Connection URLs are redacted in errors and log output
//!
//! # Architecture
//! - [`catalog`]: one [`CatalogReader`] per SQL dialect, chosen at runtime
//! - [`render`]: document model with explicit per-table section handles
//! - [`export`]: the read-then-render pipeline
//! - [`config`]: layered configuration (flags, environment, JSON file)

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod render;
pub mod security;

// Re-export commonly used types
pub use catalog::{CatalogReader, open_catalog};
pub use config::{ExportConfig, PartialConfig};
pub use error::{ExitCode, Result, SchemaDocError};
pub use export::{ExportSummary, export_schema};
pub use logging::init_logging;
pub use models::{ColumnMeta, Dialect, TableComment, TableMeta};
pub use render::{SchemaDocument, TableSection};
