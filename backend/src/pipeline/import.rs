//! Bulk import pipeline.
//!
//! Rows are imported strictly one after another in file order: each
//! row's create call is awaited to completion before the next row starts.
//! A failing row is counted and skipped; it never aborts the batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use recordsync::{import_csv, DecodeMode, ImportOptions, InMemoryCollection, SUPPLIER};
//!
//! let collection = InMemoryCollection::new("name");
//! let report = import_csv(&collection, &SUPPLIER, text, DecodeMode::Lenient, ImportOptions::default()).await?;
//! println!("{} created, {} failed", report.outcome.success_count, report.outcome.error_count);
//! ```

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::payload::build_payload;
use crate::api::logs::{log_info, log_row_warning, log_success, log_warning};
use crate::collection::RecordCollection;
use crate::config::MAX_REPORTED_FAILURES;
use crate::error::{ImportResult, RowRejection, SchemaError};
use crate::models::{
    BatchMode, EntitySchema, FailureReason, ImportOutcome, ImportReport, RowFailure, Row,
};
use crate::parser::{decode_bytes, decode_with, DecodeMode, DecodedCsv};
use crate::validation::{accept_row, validate_schema_header, RowValidator};

/// Shared flag checked between rows.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the import before its next row.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for an import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Check field formats (email, phone, numbers...) before creating.
    pub strict_fields: bool,
    /// Batching hint passed to every create call.
    pub batch_mode: BatchMode,
    /// Row failures kept in the report.
    pub max_reported_failures: usize,
    pub cancel: Option<CancelFlag>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strict_fields: false,
            batch_mode: BatchMode::Direct,
            max_reported_failures: MAX_REPORTED_FAILURES,
            cancel: None,
        }
    }
}

/// Imports rows of one entity into a collection.
pub struct Importer<'a> {
    schema: &'a EntitySchema,
    options: ImportOptions,
    validator: Option<RowValidator>,
}

impl<'a> Importer<'a> {
    pub fn new(schema: &'a EntitySchema, options: ImportOptions) -> Result<Self, SchemaError> {
        let validator = if options.strict_fields {
            Some(RowValidator::new(schema).map_err(SchemaError::InvalidRules)?)
        } else {
            None
        };
        Ok(Self { schema, options, validator })
    }

    /// Check the header, then import every data row.
    ///
    /// A missing required column fails before any create call.
    pub async fn import_decoded<C: RecordCollection>(
        &self,
        collection: &C,
        decoded: &DecodedCsv,
    ) -> Result<ImportReport, SchemaError> {
        if let Err(err) = validate_schema_header(&decoded.header, self.schema) {
            log_warning(format!("Import of {} aborted: {}", self.schema.entity, err));
            return Err(err);
        }
        Ok(self.import_rows(collection, &decoded.rows).await)
    }

    /// Import rows in order, counting every row as a success or an error.
    pub async fn import_rows<C: RecordCollection>(&self, collection: &C, rows: &[Row]) -> ImportReport {
        let started_at = Utc::now();
        log_info(format!("📥 Importing {} {} row(s)...", rows.len(), self.schema.entity));

        let mut outcome = ImportOutcome::default();
        let mut failures = Vec::new();
        let mut processed = 0;
        let mut cancelled = false;

        for (idx, row) in rows.iter().enumerate() {
            if self.options.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                cancelled = true;
                break;
            }
            processed += 1;
            let row_number = idx + 1;

            match self.import_row(collection, row).await {
                Ok(()) => outcome.success_count += 1,
                Err(reason) => {
                    outcome.error_count += 1;
                    log_row_warning(format!("Row {}: {}", row_number, describe(&reason)));
                    if failures.len() < self.options.max_reported_failures {
                        failures.push(RowFailure { row: row_number, reason });
                    }
                }
            }
        }

        if cancelled {
            log_warning(format!(
                "Import cancelled after {} of {} row(s)",
                processed,
                rows.len()
            ));
        }
        if outcome.error_count == 0 {
            log_success(format!("{} record(s) created", outcome.success_count));
        } else {
            log_warning(format!(
                "{} record(s) created, {} failed",
                outcome.success_count, outcome.error_count
            ));
        }

        ImportReport {
            entity: self.schema.entity.to_string(),
            outcome,
            processed,
            cancelled,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn import_row<C: RecordCollection>(&self, collection: &C, row: &Row) -> Result<(), FailureReason> {
        let payload = build_payload(self.schema, row);
        accept_row(&payload, self.schema.primary).map_err(|r| FailureReason::from(&r))?;
        if let Some(validator) = &self.validator {
            validator
                .check(row)
                .map_err(|r: RowRejection| FailureReason::from(&r))?;
        }

        collection
            .create(payload, &self.options.batch_mode)
            .await
            .map(|_| ())
            .map_err(|e| FailureReason::CreateFailed(e.to_string()))
    }
}

fn describe(reason: &FailureReason) -> String {
    match reason {
        FailureReason::Rejected(m) => format!("rejected, {}", m),
        FailureReason::CreateFailed(m) => format!("create failed, {}", m),
    }
}

/// Decode `text` and import it.
pub async fn import_csv<C: RecordCollection>(
    collection: &C,
    schema: &EntitySchema,
    text: &str,
    mode: DecodeMode,
    options: ImportOptions,
) -> ImportResult<ImportReport> {
    let decoded = decode_with(text, mode)?;
    let importer = Importer::new(schema, options)?;
    Ok(importer.import_decoded(collection, &decoded).await?)
}

/// Transcode and decode raw file bytes, then import them.
pub async fn import_bytes<C: RecordCollection>(
    collection: &C,
    schema: &EntitySchema,
    bytes: &[u8],
    mode: DecodeMode,
    options: ImportOptions,
) -> ImportResult<ImportReport> {
    let decoded = decode_bytes(bytes, mode)?;
    let importer = Importer::new(schema, options)?;
    Ok(importer.import_decoded(collection, &decoded).await?)
}
