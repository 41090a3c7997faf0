//! Error types for the recordsync engine.
//!
//! One error type per layer:
//!
//! - [`CodecError`] - CSV decoding and byte transcoding errors
//! - [`SchemaError`] - Header preconditions and schema lookup
//! - [`RowRejection`] - Per-row, non-fatal rejection reasons
//! - [`CreateError`] - Failures reported by a record collection
//! - [`ImportError`] - Fatal import errors (nothing was imported)
//! - [`ExportError`] - Export errors, including "nothing to export"
//! - [`ConfigError`] - Invalid environment configuration
//! - [`ServerError`] - HTTP surface errors
//!
//! Conversions are provided via `From` so `?` works across layers.

use thiserror::Error;

// =============================================================================
// Codec Errors
// =============================================================================

/// Errors while turning raw input into decoded CSV.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A quoted field was still open at end of input (strict decoding only).
    #[error("Unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },

    /// Input bytes could not be transcoded to text.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The supplied file is not a `.csv` file.
    #[error("Not a CSV file: {0}")]
    NotCsv(String),

    /// Failed to read input.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Fatal, whole-import precondition failures.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The header lacks one or more required field names.
    #[error("Missing required column(s): {}. Expected header: {}", .missing.join(", "), .expected.join(", "))]
    MissingFields {
        missing: Vec<String>,
        expected: Vec<String>,
    },

    /// No schema is registered under this entity name.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// Field rules could not be compiled.
    #[error("Invalid field rules: {0}")]
    InvalidRules(String),
}

// =============================================================================
// Row Rejections
// =============================================================================

/// Why a single row was rejected before any create call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    /// The primary field is empty after trimming.
    #[error("missing primary value '{field}'")]
    MissingPrimary { field: String },

    /// A field failed a strict format check.
    #[error("invalid value for '{field}': {message}")]
    InvalidField { field: String, message: String },
}

// =============================================================================
// Create Errors
// =============================================================================

/// Errors returned by a record collection's create operation.
#[derive(Debug, Clone, Error)]
pub enum CreateError {
    /// The backing store rejected the payload.
    #[error("Validation rejected: {0}")]
    Validation(String),

    /// A record with the same identity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The request never got a definite answer.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The remote side answered with an unexpected status.
    #[error("Remote error {status}: {message}")]
    Remote { status: u16, message: String },
}

// =============================================================================
// Import / Export Errors
// =============================================================================

/// Errors that abort an import before any row is processed.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Input could not be decoded.
    #[error("CSV error: {0}")]
    Codec(#[from] CodecError),

    /// Header precondition failed.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Errors during export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There were no records to export.
    #[error("Nothing to export")]
    EmptyInput,

    /// Listing the source collection failed.
    #[error("Failed to list records: {0}")]
    Source(#[from] CreateError),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Import failed up front.
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// Export failed.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<SchemaError> for ServerError {
    fn from(err: SchemaError) -> Self {
        ServerError::Import(ImportError::Schema(err))
    }
}

impl From<CodecError> for ServerError {
    fn from(err: CodecError) -> Self {
        ServerError::Import(ImportError::Codec(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Result type for collection create calls.
pub type CreateResult<T> = Result<T, CreateError>;

/// Result type for imports.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for exports.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_both() {
        let err = SchemaError::MissingFields {
            missing: vec!["tel".into(), "address".into()],
            expected: vec!["name".into(), "tel".into(), "address".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("tel, address"));
        assert!(msg.contains("name, tel, address"));
    }

    #[test]
    fn test_error_conversion_chain() {
        let codec = CodecError::UnterminatedQuote { line: 3 };
        let import: ImportError = codec.into();
        assert!(import.to_string().contains("line 3"));

        let server: ServerError = SchemaError::UnknownEntity("widget".into()).into();
        assert!(server.to_string().contains("widget"));
    }

    #[test]
    fn test_row_rejection_format() {
        let r = RowRejection::MissingPrimary { field: "name".into() };
        assert_eq!(r.to_string(), "missing primary value 'name'");
    }
}
