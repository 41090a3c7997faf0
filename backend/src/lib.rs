//! # Recordsync - CSV import/export for record collections
//!
//! Recordsync moves records between CSV files and a record collection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV bytes  │────▶│   Codec     │────▶│  Validator  │────▶│   Import    │──▶ create()
//! │ (BOM, UTF8) │     │  (decode)   │     │ (header/row)│     │ (sequential)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!
//!   records ─────────▶ Export ─────────▶ Codec (encode) ─────▶ CSV file content
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recordsync::{import_csv, DecodeMode, ImportOptions, InMemoryCollection, SUPPLIER};
//!
//! #[tokio::main]
//! async fn main() {
//!     let suppliers = InMemoryCollection::new("name");
//!     let text = std::fs::read_to_string("suppliers.csv").unwrap();
//!     let report = import_csv(&suppliers, &SUPPLIER, &text, DecodeMode::Lenient, ImportOptions::default())
//!         .await
//!         .unwrap();
//!     println!("{} created, {} failed", report.outcome.success_count, report.outcome.error_count);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Records, entity schemas, import results
//! - [`parser`] - Quoting-aware CSV codec
//! - [`validation`] - Header precondition and row checks
//! - [`collection`] - Record collections (in-memory, HTTP)
//! - [`pipeline`] - Import and export pipelines
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Codec
pub mod parser;

// Validation
pub mod validation;

// Collections
pub mod collection;

// Pipelines
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CodecError, ConfigError, CreateError, ExportError, ImportError, RowRejection, SchemaError,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    BatchMode, EntitySchema, ExportFile, FailureReason, FieldKind, FieldRule, FieldSpec,
    ImportOutcome, ImportReport, Record, Row, RowFailure, PRODUCT, SCHEMAS, SUPPLIER,
};

// =============================================================================
// Re-exports - Codec
// =============================================================================

pub use parser::{
    decode, decode_bytes, decode_file, decode_with, encode, escape_field, DecodeMode, DecodedCsv,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{accept_row, validate_header, validate_schema_header, RowValidator};

// =============================================================================
// Re-exports - Collections
// =============================================================================

pub use collection::{Collection, FnCollection, HttpCollection, InMemoryCollection, RecordCollection};

// =============================================================================
// Re-exports - Pipelines
// =============================================================================

pub use pipeline::{
    build_payload, export_collection, export_entity, export_records, import_bytes, import_csv,
    parse_selection, select_for_export, CancelFlag, ImportOptions, Importer,
};

// =============================================================================
// Re-exports - Config & API
// =============================================================================

pub use config::Config;

pub use api::types::{error_response, ImportResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
