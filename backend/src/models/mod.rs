//! Domain models for the import/export engine.
//!
//! - [`Record`] / [`Row`] - a created record and a decoded CSV row
//! - [`EntitySchema`] - ordered field declarations for one entity
//! - [`FieldKind`] / [`FieldRule`] - how a field is built and checked
//! - [`ImportOutcome`] / [`ImportReport`] - results of a bulk import
//! - [`BatchMode`] - batching hint passed to every create call
//! - [`ExportFile`] - CSV content plus file-sink metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{RowRejection, SchemaError};

/// A record as sent to, or returned by, a collection.
pub type Record = Map<String, Value>;

/// One decoded data row, keyed by header field name.
pub type Row = BTreeMap<String, String>;

// =============================================================================
// Schema
// =============================================================================

/// How a raw CSV value becomes a payload value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Trimmed string.
    Text,
    /// Passed through verbatim.
    LongText,
    /// Finite number, `null` when empty or unparseable.
    Number,
    /// Trimmed string, `null` when empty.
    OptionalText,
}

/// Format constraint checked when strict field checks are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRule {
    Email,
    Phone,
    /// Must not consist of a number only.
    NotNumeric,
}

/// A declared field of an entity.
#[derive(Debug, Clone, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub rule: Option<FieldRule>,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, rule: None }
    }

    const fn with_rule(name: &'static str, kind: FieldKind, rule: FieldRule) -> Self {
        Self { name, kind, rule: Some(rule) }
    }
}

/// Ordered field declarations for one importable/exportable entity.
///
/// Field order is the required-header order, the payload order and the
/// export column order.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySchema {
    /// Entity name used in URLs and on the command line.
    pub entity: &'static str,
    /// File stem suggested for exports.
    pub file_stem: &'static str,
    /// Field that must be non-empty for a row to be accepted.
    pub primary: &'static str,
    pub fields: &'static [FieldSpec],
}

const SUPPLIER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("name", FieldKind::Text),
    FieldSpec::with_rule("email", FieldKind::Text, FieldRule::Email),
    FieldSpec::with_rule("tel", FieldKind::Text, FieldRule::Phone),
    FieldSpec::new("address", FieldKind::LongText),
    FieldSpec::new("description", FieldKind::LongText),
];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::with_rule("name", FieldKind::Text, FieldRule::NotNumeric),
    FieldSpec::with_rule("description", FieldKind::LongText, FieldRule::NotNumeric),
    FieldSpec::with_rule("category", FieldKind::Text, FieldRule::NotNumeric),
    FieldSpec::new("price", FieldKind::Number),
    FieldSpec::new("stock", FieldKind::Number),
    FieldSpec::new("supplier_uuid", FieldKind::OptionalText),
];

/// Supplier schema: `name,email,tel,address,description`.
pub const SUPPLIER: EntitySchema = EntitySchema {
    entity: "supplier",
    file_stem: "suppliers",
    primary: "name",
    fields: SUPPLIER_FIELDS,
};

/// Product schema: `name,description,category,price,stock,supplier_uuid`.
pub const PRODUCT: EntitySchema = EntitySchema {
    entity: "product",
    file_stem: "products",
    primary: "name",
    fields: PRODUCT_FIELDS,
};

/// All built-in schemas.
pub const SCHEMAS: &[&EntitySchema] = &[&SUPPLIER, &PRODUCT];

impl EntitySchema {
    /// Look up a built-in schema by entity name (plural accepted).
    pub fn by_name(name: &str) -> Result<&'static EntitySchema, SchemaError> {
        let wanted = name.trim().to_lowercase();
        SCHEMAS
            .iter()
            .copied()
            .find(|s| s.entity == wanted || s.file_stem == wanted)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// =============================================================================
// Import results
// =============================================================================

/// Aggregate counters of a completed bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success_count: usize,
    pub error_count: usize,
}

impl ImportOutcome {
    /// Rows accounted for so far.
    pub fn total(&self) -> usize {
        self.success_count + self.error_count
    }
}

/// Why a row counted as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "message")]
pub enum FailureReason {
    /// Rejected before the create call.
    Rejected(String),
    /// The create call failed.
    CreateFailed(String),
}

impl From<&RowRejection> for FailureReason {
    fn from(r: &RowRejection) -> Self {
        FailureReason::Rejected(r.to_string())
    }
}

/// Diagnostic for a single failed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    pub reason: FailureReason,
}

/// Full result of an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub entity: String,
    pub outcome: ImportOutcome,
    /// Rows that were looked at; equals the row count unless cancelled.
    pub processed: usize,
    pub cancelled: bool,
    /// First failures, capped by the import options.
    pub failures: Vec<RowFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

// =============================================================================
// Batching
// =============================================================================

/// Batching hint handed to each create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode", content = "group")]
pub enum BatchMode {
    /// Each create is sent on its own.
    #[default]
    Direct,
    /// Creates are tagged with a named update group.
    Group(String),
}

impl BatchMode {
    pub fn group_id(&self) -> Option<&str> {
        match self {
            BatchMode::Direct => None,
            BatchMode::Group(id) => Some(id),
        }
    }
}

// =============================================================================
// Export
// =============================================================================

/// Export content plus what the file sink needs to save it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub content: String,
    pub suggested_name: String,
    pub extension: String,
    pub mime_type: String,
}

impl ExportFile {
    /// `suggested_name.extension`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.suggested_name, self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        assert_eq!(EntitySchema::by_name("supplier").unwrap().entity, "supplier");
        assert_eq!(EntitySchema::by_name("Products").unwrap().entity, "product");
        assert!(matches!(
            EntitySchema::by_name("widget"),
            Err(SchemaError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_supplier_field_order() {
        assert_eq!(
            SUPPLIER.field_names(),
            vec!["name", "email", "tel", "address", "description"]
        );
        assert_eq!(SUPPLIER.field("address").unwrap().kind, FieldKind::LongText);
    }

    #[test]
    fn test_batch_mode_serialization() {
        let json = serde_json::to_value(BatchMode::Group("bulk".into())).unwrap();
        assert_eq!(json["mode"], "group");
        assert_eq!(json["group"], "bulk");
        assert_eq!(BatchMode::Direct.group_id(), None);
    }

    #[test]
    fn test_export_file_name() {
        let f = ExportFile {
            content: String::new(),
            suggested_name: "suppliers".into(),
            extension: "csv".into(),
            mime_type: "text/csv".into(),
        };
        assert_eq!(f.file_name(), "suppliers.csv");
    }
}
