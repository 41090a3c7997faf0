//! Quoting-aware CSV codec.
//!
//! Decoding is a single left-to-right scan with one character of lookahead
//! for escaped quotes. Embedded delimiters, quotes and line breaks survive
//! a round trip through [`encode`] and [`decode`].
//!
//! Format: comma delimiter, `"` quoting with `""` escapes, CRLF rows on
//! encode (LF or CRLF on decode), UTF-8 with a leading byte-order-mark.

use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::error::{CodecError, CodecResult};
use crate::models::{Record, Row};

/// Byte-order-mark prefixed to encoded output and stripped on decode.
pub const BOM: char = '\u{FEFF}';

const UTF8_BOM_BYTES: &[u8] = &[0xEF, 0xBB, 0xBF];

/// How to treat a quoted field still open at end of input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Quoted mode extends to end of input; the partial field is kept.
    #[default]
    Lenient,
    /// Fail with [`CodecError::UnterminatedQuote`].
    Strict,
}

/// Header plus header-keyed data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedCsv {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl DecodedCsv {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode CSV text leniently.
///
/// # Example
/// ```
/// use recordsync::parser::decode;
///
/// let csv = decode("name,note\n\"Bob, Jr.\",\"a \"\"b\"\"\"\n");
/// assert_eq!(csv.header, vec!["name", "note"]);
/// assert_eq!(csv.rows[0]["name"], "Bob, Jr.");
/// assert_eq!(csv.rows[0]["note"], "a \"b\"");
/// ```
pub fn decode(text: &str) -> DecodedCsv {
    match split_records(text, DecodeMode::Lenient) {
        Ok(records) => map_records(records),
        // Lenient scanning never reports an unterminated quote.
        Err(_) => DecodedCsv::default(),
    }
}

/// Decode CSV text with an explicit [`DecodeMode`].
pub fn decode_with(text: &str, mode: DecodeMode) -> CodecResult<DecodedCsv> {
    split_records(text, mode).map(map_records)
}

/// Scan `text` into raw records of unmapped fields.
fn split_records(text: &str, mode: DecodeMode) -> CodecResult<Vec<Vec<String>>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 1;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\n' {
            line += 1;
        }
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
        } else {
            match ch {
                '"' => {
                    in_quotes = true;
                    quote_line = line;
                }
                ',' => record.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                _ => field.push(ch),
            }
        }
    }

    if in_quotes && mode == DecodeMode::Strict {
        return Err(CodecError::UnterminatedQuote { line: quote_line });
    }

    record.push(field);
    // A lone empty field here is a trailing line break, not a row.
    if record.len() > 1 || record.first().is_some_and(|f| !f.is_empty()) {
        records.push(record);
    }

    Ok(records)
}

/// Turn raw records into a trimmed header and header-keyed rows.
fn map_records(mut records: Vec<Vec<String>>) -> DecodedCsv {
    if records.is_empty() {
        return DecodedCsv::default();
    }

    let data = records.split_off(1);
    let mut header_fields = records.swap_remove(0);
    if let Some(first) = header_fields.first_mut() {
        if let Some(stripped) = first.strip_prefix(BOM) {
            *first = stripped.to_string();
        }
    }
    let header: Vec<String> = header_fields.iter().map(|h| h.trim().to_string()).collect();

    let rows = data
        .into_iter()
        .map(|fields| {
            header
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let value = fields.get(idx).map(|v| v.trim()).unwrap_or("");
                    (name.clone(), value.to_string())
                })
                .collect::<Row>()
        })
        .collect();

    DecodedCsv { header, rows }
}

// =============================================================================
// Encoding
// =============================================================================

/// Escape one field: double every quote, then quote the field when it
/// contains a delimiter, quote or line break.
pub fn escape_field(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    if escaped.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", escaped)
    } else {
        escaped
    }
}

/// Render a JSON value as CSV cell text. `null` becomes empty.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Encode records as CSV with `header_fields` as the column order.
///
/// Missing keys encode as empty cells. Rows are joined with CRLF and the
/// output starts with a byte-order-mark.
///
/// # Example
/// ```
/// use recordsync::parser::encode;
/// use serde_json::json;
///
/// let rec = json!({"name": "Bob, Jr.", "note": "plain"});
/// let out = encode(&["name", "note"], &[rec.as_object().unwrap().clone()]);
/// assert_eq!(out, "\u{FEFF}name,note\r\n\"Bob, Jr.\",plain");
/// ```
pub fn encode<S: AsRef<str>>(header_fields: &[S], records: &[Record]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        header_fields
            .iter()
            .map(|h| escape_field(h.as_ref()))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        lines.push(
            header_fields
                .iter()
                .map(|h| escape_field(&cell_text(record.get(h.as_ref()))))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 2).sum::<usize>() + 3);
    out.push(BOM);
    out.push_str(&lines.join("\r\n"));
    out
}

// =============================================================================
// Raw input
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if bytes.starts_with(UTF8_BOM_BYTES) || std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Transcode bytes to text using the given encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CodecResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::Encoding(e.to_string())),
        // WINDOWS_1252 agrees with Latin-1 on every printable byte.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        "iso-8859-15" | "latin-9" => Ok(encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()),
        _ => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Transcode raw bytes and decode them.
pub fn decode_bytes(bytes: &[u8], mode: DecodeMode) -> CodecResult<DecodedCsv> {
    let encoding = detect_encoding(bytes);
    let text = decode_content(bytes, &encoding)?;
    decode_with(&text, mode)
}

/// Reject file names that do not end in `.csv`.
pub fn ensure_csv_name(name: &str) -> CodecResult<()> {
    if name.to_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(CodecError::NotCsv(name.to_string()))
    }
}

/// Read and decode a `.csv` file.
pub fn decode_file(path: &Path, mode: DecodeMode) -> CodecResult<DecodedCsv> {
    ensure_csv_name(&path.to_string_lossy())?;
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes, mode)
}
