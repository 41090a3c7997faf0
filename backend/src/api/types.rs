//! REST API response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{ImportReport, RowFailure};

/// Response sent after a CSV import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Status: "ready" (no failed rows), "warning" (some rows failed),
    /// "cancelled"
    pub status: String,

    pub entity: String,
    pub success_count: usize,
    pub error_count: usize,
    pub processed: usize,

    /// First row failures, in row order
    pub failures: Vec<RowFailure>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        let status = if report.cancelled {
            "cancelled"
        } else if report.outcome.error_count == 0 {
            "ready"
        } else {
            "warning"
        };

        ImportResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            entity: report.entity,
            success_count: report.outcome.success_count,
            error_count: report.outcome.error_count,
            processed: report.processed,
            failures: report.failures,
            started_at: report.started_at,
            finished_at: report.finished_at,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "successCount": 0,
        "errorCount": 0
    })
}

/// Error response for a header that lacks required columns.
pub fn missing_fields_response(error: &str, missing: &[String], expected: &[String]) -> Value {
    let mut body = error_response(error);
    body["missingFields"] = json!(missing);
    body["expectedFields"] = json!(expected);
    body
}

/// Error response for an export with nothing to export.
pub fn nothing_to_export_response(entity: &str) -> Value {
    json!({
        "status": "empty",
        "entity": entity,
        "error": "Nothing to export"
    })
}
