//! End-to-end import and export through the public API.

use recordsync::{
    decode, export_collection, import_bytes, import_csv, BatchMode, DecodeMode, ExportError,
    FailureReason, ImportError, ImportOptions, InMemoryCollection, RecordCollection, SchemaError,
    PRODUCT, SUPPLIER,
};
use serde_json::json;

const SUPPLIERS_CSV: &str = "\u{FEFF}name,email,tel,address,description\r\n\
Acme,sales@acme.io,+33 1 23 45,\"12 Rue X, Paris\",\"Says \"\"hi\"\"\"\r\n\
,nobody@x.io,,,\r\n\
Globex, ops@globex.io ,555-0100,,\"line one\nline two\"\r\n";

#[tokio::test]
async fn test_import_then_export_round_trip() {
    let suppliers = InMemoryCollection::new("name");

    let report = import_csv(
        &suppliers,
        &SUPPLIER,
        SUPPLIERS_CSV,
        DecodeMode::Lenient,
        ImportOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.outcome.success_count, 2);
    assert_eq!(report.outcome.error_count, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 2);
    assert!(matches!(report.failures[0].reason, FailureReason::Rejected(_)));

    let stored = suppliers.list().await.unwrap();
    assert_eq!(stored[0]["address"], "12 Rue X, Paris");
    assert_eq!(stored[0]["description"], "Says \"hi\"");
    assert_eq!(stored[1]["email"], "ops@globex.io");
    assert_eq!(stored[1]["description"], "line one\nline two");

    let file = export_collection(&suppliers, &SUPPLIER, &[]).await.unwrap();
    assert_eq!(file.file_name(), "suppliers.csv");
    assert_eq!(file.mime_type, "text/csv;charset=utf-8");

    let decoded = decode(&file.content);
    assert_eq!(decoded.header, vec!["name", "email", "tel", "address", "description"]);
    assert_eq!(decoded.rows.len(), 2);
    assert_eq!(decoded.rows[0]["address"], "12 Rue X, Paris");
    assert_eq!(decoded.rows[1]["description"], "line one\nline two");
}

#[tokio::test]
async fn test_reimport_of_export_conflicts_on_every_row() {
    let suppliers = InMemoryCollection::new("name");
    import_csv(&suppliers, &SUPPLIER, SUPPLIERS_CSV, DecodeMode::Lenient, ImportOptions::default())
        .await
        .unwrap();

    let file = export_collection(&suppliers, &SUPPLIER, &[]).await.unwrap();
    let again = import_csv(&suppliers, &SUPPLIER, &file.content, DecodeMode::Lenient, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(again.outcome.success_count, 0);
    assert_eq!(again.outcome.error_count, 2);
    assert!(again
        .failures
        .iter()
        .all(|f| matches!(f.reason, FailureReason::CreateFailed(_))));
    assert_eq!(suppliers.len().await, 2);
}

#[tokio::test]
async fn test_missing_header_creates_nothing() {
    let suppliers = InMemoryCollection::new("name");
    let err = import_csv(
        &suppliers,
        &SUPPLIER,
        "name,email\nAcme,sales@acme.io\n",
        DecodeMode::Lenient,
        ImportOptions::default(),
    )
    .await
    .unwrap_err();

    match err {
        ImportError::Schema(SchemaError::MissingFields { missing, .. }) => {
            assert_eq!(missing, vec!["tel", "address", "description"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(suppliers.is_empty().await);
}

#[tokio::test]
async fn test_product_numbers_from_latin1_bytes() {
    let products = InMemoryCollection::new("name");
    // "Café" in ISO-8859-1
    let mut bytes = b"name,description,category,price,stock,supplier_uuid\n".to_vec();
    bytes.extend_from_slice(b"Caf\xe9 beans,Roasted,Food,12.5,40,\n");

    let report = import_bytes(
        &products,
        &PRODUCT,
        &bytes,
        DecodeMode::Lenient,
        ImportOptions {
            batch_mode: BatchMode::Group("g-1".into()),
            ..ImportOptions::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(report.outcome.success_count, 1);
    let stored = products.list().await.unwrap();
    assert_eq!(stored[0]["price"], json!(12.5));
    assert_eq!(stored[0]["stock"], json!(40));
    assert_eq!(stored[0]["supplier_uuid"], json!(null));
    assert!(stored[0]["name"].as_str().unwrap().ends_with(" beans"));
}

#[tokio::test]
async fn test_export_selection_and_empty_collection() {
    let suppliers = InMemoryCollection::new("name");
    let err = export_collection(&suppliers, &SUPPLIER, &[]).await.unwrap_err();
    assert!(matches!(err, ExportError::EmptyInput));

    import_csv(&suppliers, &SUPPLIER, SUPPLIERS_CSV, DecodeMode::Lenient, ImportOptions::default())
        .await
        .unwrap();

    let file = export_collection(&suppliers, &SUPPLIER, &[1]).await.unwrap();
    let decoded = decode(&file.content);
    assert_eq!(decoded.rows.len(), 1);
    assert_eq!(decoded.rows[0]["name"], "Globex");
}
