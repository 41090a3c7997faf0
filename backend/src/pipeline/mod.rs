//! Import and export pipelines.
//!
//! - Payload: decoded row to create payload
//! - Import: header precondition, then sequential per-row creates
//! - Export: record selection to CSV file content

pub mod export;
pub mod import;
pub mod payload;

pub use export::{
    export_collection, export_entity, export_records, parse_selection, select_for_export,
};
pub use import::{import_bytes, import_csv, CancelFlag, ImportOptions, Importer};
pub use payload::build_payload;
