//! Row to payload conversion.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::models::{EntitySchema, FieldKind, Record, Row};
use crate::validation::NUMBER_PATTERN;

static NUMBER_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(NUMBER_PATTERN).ok());

/// Build a create payload holding only the schema's declared fields.
///
/// Missing columns read as empty. Text is trimmed, long text is kept
/// verbatim, numbers become JSON numbers (or `null`) and optional text
/// becomes `null` when empty.
pub fn build_payload(schema: &EntitySchema, row: &Row) -> Record {
    schema
        .fields
        .iter()
        .map(|field| {
            let raw = row.get(field.name).map(String::as_str).unwrap_or("");
            (field.name.to_string(), convert(field.kind, raw))
        })
        .collect()
}

fn convert(kind: FieldKind, raw: &str) -> Value {
    match kind {
        FieldKind::Text => Value::String(raw.trim().to_string()),
        FieldKind::LongText => Value::String(raw.to_string()),
        FieldKind::Number => parse_number(raw).unwrap_or(Value::Null),
        FieldKind::OptionalText => match raw.trim() {
            "" => Value::Null,
            s => Value::String(s.to_string()),
        },
    }
}

/// Parse a numeric cell; integers stay integers.
pub fn parse_number(raw: &str) -> Option<Value> {
    if !NUMBER_RE.as_ref().is_some_and(|re| re.is_match(raw)) {
        return None;
    }
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
