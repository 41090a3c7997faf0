//! Bulk export pipeline.
//!
//! Exports never produce a header-only file: an empty selection is
//! reported as [`ExportError::EmptyInput`] so the caller can show
//! "nothing to export" instead of saving an empty file.

use crate::api::logs::{log_info, log_success};
use crate::collection::RecordCollection;
use crate::config::{EXPORT_EXTENSION, EXPORT_MIME_TYPE};
use crate::error::{ExportError, ExportResult};
use crate::models::{EntitySchema, ExportFile, Record};
use crate::parser::encode;

/// Encode `records` as CSV with `fields` as the header.
pub fn export_records<S: AsRef<str>>(records: &[Record], fields: &[S]) -> ExportResult<String> {
    if records.is_empty() {
        return Err(ExportError::EmptyInput);
    }
    Ok(encode(fields, records))
}

/// Export records of one entity, ready for the file sink.
pub fn export_entity(records: &[Record], schema: &EntitySchema) -> ExportResult<ExportFile> {
    let content = export_records(records, &schema.field_names())?;
    Ok(ExportFile {
        content,
        suggested_name: schema.file_stem.to_string(),
        extension: EXPORT_EXTENSION.to_string(),
        mime_type: EXPORT_MIME_TYPE.to_string(),
    })
}

/// The selected records in selection order, or all records when nothing
/// (valid) is selected.
pub fn select_for_export(all: &[Record], selected: &[usize]) -> Vec<Record> {
    let picked: Vec<Record> = selected
        .iter()
        .filter_map(|&idx| all.get(idx).cloned())
        .collect();
    if picked.is_empty() {
        all.to_vec()
    } else {
        picked
    }
}

/// Parse `"2,0, 5"` into record indexes, ignoring anything that is not one.
pub fn parse_selection(raw: Option<&str>) -> Vec<usize> {
    raw.map(|s| s.split(',').filter_map(|p| p.trim().parse().ok()).collect())
        .unwrap_or_default()
}

/// List a collection, apply the selection and export the result.
pub async fn export_collection<C: RecordCollection>(
    collection: &C,
    schema: &EntitySchema,
    selected: &[usize],
) -> ExportResult<ExportFile> {
    let all = collection.list().await?;
    let records = select_for_export(&all, selected);
    log_info(format!("📤 Exporting {} {} record(s)...", records.len(), schema.entity));
    let file = export_entity(&records, schema)?;
    log_success(format!("Export ready: {}", file.file_name()));
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::InMemoryCollection;
    use crate::models::{BatchMode, SUPPLIER};
    use crate::parser::{decode, BOM};
    use serde_json::{json, Value};

    fn rec(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            export_records::<&str>(&[], &["name"]),
            Err(ExportError::EmptyInput)
        ));
        assert!(matches!(export_entity(&[], &SUPPLIER), Err(ExportError::EmptyInput)));
    }

    #[test]
    fn test_export_entity_file() {
        let records = vec![rec(json!({
            "name": "Bob, Jr.",
            "email": "b@y.com",
            "tel": null,
            "address": "line1\nline2",
            "description": "said \"hi\"",
            "ID": "not exported"
        }))];
        let file = export_entity(&records, &SUPPLIER).unwrap();

        assert_eq!(file.file_name(), "suppliers.csv");
        assert_eq!(file.mime_type, "text/csv;charset=utf-8");
        assert!(file.content.starts_with(BOM));
        assert_eq!(
            file.content,
            "\u{FEFF}name,email,tel,address,description\r\n\"Bob, Jr.\",b@y.com,,\"line1\nline2\",\"said \"\"hi\"\"\""
        );

        let back = decode(&file.content);
        assert_eq!(back.header, SUPPLIER.field_names());
        assert_eq!(back.rows[0]["address"], "line1\nline2");
        assert_eq!(back.rows[0]["description"], "said \"hi\"");
    }

    #[test]
    fn test_selection() {
        let all: Vec<Record> = ["a", "b", "c"].iter().map(|n| rec(json!({ "name": n }))).collect();
        assert_eq!(select_for_export(&all, &[]).len(), 3);
        let picked = select_for_export(&all, &[2, 0]);
        assert_eq!(picked[0]["name"], "c");
        assert_eq!(picked[1]["name"], "a");
        assert_eq!(select_for_export(&all, &[7]).len(), 3);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection(None), Vec::<usize>::new());
        assert_eq!(parse_selection(Some("")), Vec::<usize>::new());
        assert_eq!(parse_selection(Some("2,0, 5,x,-1")), vec![2, 0, 5]);
    }

    #[tokio::test]
    async fn test_export_collection() {
        let c = InMemoryCollection::new("name");
        assert!(matches!(
            export_collection(&c, &SUPPLIER, &[]).await,
            Err(ExportError::EmptyInput)
        ));

        c.create(rec(json!({ "name": "Ada" })), &BatchMode::Direct).await.unwrap();
        let file = export_collection(&c, &SUPPLIER, &[]).await.unwrap();
        assert!(file.content.ends_with("\r\nAda,,,,"));
    }
}
