//! Header and row validation.
//!
//! Two layers of checks happen before any record is created:
//!
//! - [`validate_header`] - fail-fast precondition, every required field name
//!   must be present in the header or nothing is imported
//! - [`accept_row`] - per-row, the primary field must be non-empty
//!
//! When strict field checks are enabled, a [`RowValidator`] additionally
//! checks each raw value against the JSON Schema (draft 7) rendered by
//! [`field_schema`] for the entity's declared kinds and rules.

use serde_json::{json, Value};
use std::collections::HashSet;

use crate::error::{RowRejection, SchemaError};
use crate::models::{EntitySchema, FieldKind, FieldRule, FieldSpec, Record, Row};

/// Non-empty email: `local@domain.tld` without whitespace.
pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Phone numbers: digits, `+`, spaces, parentheses and dashes.
pub const PHONE_PATTERN: &str = r"^[0-9+\s()-]+$";

/// A value that is nothing but a plain decimal number.
pub const PURE_NUMBER_PATTERN: &str = r"^\s*[+-]?\d+(\.\d+)?\s*$";

/// Anything accepted as a finite number in a numeric column.
pub const NUMBER_PATTERN: &str = r"^\s*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?\s*$";

/// Check that every required name appears in `header`.
///
/// Missing names are reported in the order they were declared.
///
/// # Example
/// ```
/// use recordsync::validation::validate_header;
///
/// let header = vec!["name".to_string(), "email".to_string()];
/// assert!(validate_header(&header, &["name"]).is_ok());
/// assert!(validate_header(&header, &["name", "tel"]).is_err());
/// ```
pub fn validate_header<S: AsRef<str>>(header: &[String], required: &[S]) -> Result<(), SchemaError> {
    let present: HashSet<&str> = header.iter().map(String::as_str).collect();
    let missing: Vec<String> = required
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| !present.contains(r))
        .map(str::to_string)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingFields {
            missing,
            expected: required.iter().map(|r| r.as_ref().to_string()).collect(),
        })
    }
}

/// Header check against all fields of an entity schema.
pub fn validate_schema_header(header: &[String], schema: &EntitySchema) -> Result<(), SchemaError> {
    validate_header(header, &schema.field_names())
}

/// Reject a payload whose primary field is empty after trimming.
pub fn accept_row(payload: &Record, primary: &str) -> Result<(), RowRejection> {
    let filled = match payload.get(primary) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    };

    if filled {
        Ok(())
    } else {
        Err(RowRejection::MissingPrimary { field: primary.to_string() })
    }
}

/// JSON Schema for one raw (string) CSV value of `field`.
///
/// Empty values always validate; the primary-field check is separate.
pub fn field_schema(field: &FieldSpec) -> Value {
    let mut alternatives = Vec::new();
    if field.kind == FieldKind::Number {
        alternatives.push(json!({ "pattern": NUMBER_PATTERN }));
    }
    match field.rule {
        Some(FieldRule::Email) => alternatives.push(json!({ "pattern": EMAIL_PATTERN })),
        Some(FieldRule::Phone) => alternatives.push(json!({ "pattern": PHONE_PATTERN })),
        Some(FieldRule::NotNumeric) => {
            alternatives.push(json!({ "not": { "pattern": PURE_NUMBER_PATTERN } }))
        }
        None => {}
    }

    if alternatives.is_empty() {
        return json!({ "type": "string" });
    }
    let rules = if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        json!({ "allOf": alternatives })
    };
    json!({
        "type": "string",
        "anyOf": [ { "maxLength": 0 }, rules ]
    })
}

/// JSON Schema for a whole raw row of `schema`.
pub fn row_schema(schema: &EntitySchema) -> Value {
    let properties: serde_json::Map<String, Value> = schema
        .fields
        .iter()
        .map(|f| (f.name.to_string(), field_schema(f)))
        .collect();
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": schema.entity,
        "type": "object",
        "required": schema.field_names(),
        "properties": properties
    })
}

/// Compiled per-field format checks for one entity.
pub struct RowValidator {
    fields: Vec<(&'static str, jsonschema::Validator)>,
}

impl RowValidator {
    /// Compile validators for every field that carries a check.
    pub fn new(schema: &EntitySchema) -> Result<Self, String> {
        let mut fields = Vec::new();
        for field in schema.fields {
            if field.rule.is_none() && field.kind != FieldKind::Number {
                continue;
            }
            let validator = jsonschema::draft7::new(&field_schema(field))
                .map_err(|e| format!("Invalid schema for '{}': {}", field.name, e))?;
            fields.push((field.name, validator));
        }
        Ok(Self { fields })
    }

    /// Check a raw row; the first failing field is reported.
    pub fn check(&self, row: &Row) -> Result<(), RowRejection> {
        for (name, validator) in &self.fields {
            let raw = row.get(*name).map(String::as_str).unwrap_or("");
            let value = Value::String(raw.to_string());
            let first = validator.iter_errors(&value).next().map(|e| e.to_string());
            if let Some(detail) = first {
                return Err(RowRejection::InvalidField {
                    field: name.to_string(),
                    message: describe_failure(raw, &detail),
                });
            }
        }
        Ok(())
    }
}

fn describe_failure(raw: &str, detail: &str) -> String {
    format!("'{}' does not match the expected format ({})", raw, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PRODUCT, SUPPLIER};
    use serde_json::json;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_header_complete() {
        let h = header(&["description", "name", "tel", "email", "address", "extra"]);
        assert!(validate_schema_header(&h, &SUPPLIER).is_ok());
    }

    #[test]
    fn test_header_missing_in_declared_order() {
        let h = header(&["email", "name"]);
        match validate_schema_header(&h, &SUPPLIER) {
            Err(SchemaError::MissingFields { missing, expected }) => {
                assert_eq!(missing, vec!["tel", "address", "description"]);
                assert_eq!(expected.len(), 5);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_header_empty() {
        assert!(validate_header(&[], &["name"]).is_err());
        assert!(validate_header::<&str>(&[], &[]).is_ok());
    }

    #[test]
    fn test_accept_row() {
        let ok = json!({ "name": "Ada" });
        assert!(accept_row(ok.as_object().unwrap(), "name").is_ok());

        for bad in [json!({ "name": "   " }), json!({ "name": null }), json!({})] {
            assert_eq!(
                accept_row(bad.as_object().unwrap(), "name"),
                Err(RowRejection::MissingPrimary { field: "name".into() })
            );
        }
    }

    #[test]
    fn test_supplier_rules() {
        let v = RowValidator::new(&SUPPLIER).unwrap();
        assert!(v.check(&row(&[("email", "a@x.com"), ("tel", "+90 (212) 555-11")])).is_ok());
        assert!(v.check(&row(&[("email", ""), ("tel", "")])).is_ok());

        let err = v.check(&row(&[("email", "not-an-email")])).unwrap_err();
        assert!(matches!(err, RowRejection::InvalidField { ref field, .. } if field == "email"));

        let err = v.check(&row(&[("email", "a@x.com"), ("tel", "call me")])).unwrap_err();
        assert!(matches!(err, RowRejection::InvalidField { ref field, .. } if field == "tel"));
    }

    #[test]
    fn test_product_rules() {
        let v = RowValidator::new(&PRODUCT).unwrap();
        assert!(v
            .check(&row(&[("name", "Chair"), ("price", "199.99"), ("stock", "25")]))
            .is_ok());
        assert!(v.check(&row(&[("name", "Chair"), ("price", "1e3")])).is_ok());

        let err = v.check(&row(&[("name", "12345")])).unwrap_err();
        assert!(matches!(err, RowRejection::InvalidField { ref field, .. } if field == "name"));

        let err = v.check(&row(&[("name", "Chair"), ("price", "cheap")])).unwrap_err();
        assert!(matches!(err, RowRejection::InvalidField { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_row_schema_shape() {
        let s = row_schema(&SUPPLIER);
        assert_eq!(s["required"], json!(["name", "email", "tel", "address", "description"]));
        assert_eq!(s["properties"]["address"], json!({ "type": "string" }));
        assert!(jsonschema::draft7::is_valid(
            &s,
            &json!({ "name": "A", "email": "", "tel": "", "address": "", "description": "" })
        ));
    }
}
