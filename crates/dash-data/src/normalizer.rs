//! CSV parsing and schema-driven normalization.
//!
//! Turns raw export text into [`RawRow`]s, then maps each row onto the
//! internal keys of a [`Schema`], coercing cells as it goes. A bad cell never
//! fails the row: it falls back to the field's default and is logged at trace
//! level.

use std::collections::HashMap;

use dash_core::error::{DashError, Result};
use dash_core::models::{FieldValue, NormalizedRecord, UNKNOWN};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::schema::{FieldKind, FieldSpec, Schema};

/// One CSV line keyed by its exact column header.
pub type RawRow = HashMap<String, String>;

const BOM: char = '\u{feff}';

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse CSV text with a header line into raw rows.
///
/// Rows with more or fewer cells than the header are accepted; missing cells
/// are simply absent from the row. Rows the reader cannot decode are skipped
/// with a warning. Fails when the header line itself cannot be read, or when
/// the body is an HTML page (what a sharing link serves when the file is not
/// public).
pub fn parse_csv(text: &str) -> Result<Vec<RawRow>> {
    let body = text.trim_start_matches(BOM);
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    if looks_like_html(body) {
        return Err(DashError::CsvParse(
            "received an HTML page instead of CSV".to_string(),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DashError::CsvParse(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches(BOM).to_string())
        .collect();

    let mut rows = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // +2: 1-indexed plus the header line.
                warn!("skipping CSV line {}: {}", line_num + 2, e);
                continue;
            }
        };
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start()
        .chars()
        .take(15)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// Map raw rows onto `schema`. Never fails; an empty input gives an empty
/// output.
pub fn normalize(rows: &[RawRow], schema: &Schema) -> Vec<NormalizedRecord> {
    let mut defaulted = 0usize;
    let records: Vec<NormalizedRecord> = rows
        .iter()
        .map(|row| normalize_row(row, schema, &mut defaulted))
        .collect();

    if defaulted > 0 {
        debug!(
            file = schema.file_name,
            rows = records.len(),
            defaulted,
            "applied field defaults during normalization"
        );
    }
    records
}

/// Normalize rows handed over as JSON (an array of objects).
///
/// Anything that is not an array yields an empty result; array elements that
/// are not objects are skipped.
pub fn normalize_json(value: &Value, schema: &Schema) -> Vec<NormalizedRecord> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    let rows: Vec<RawRow> = items
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| {
                    let cell = match v {
                        Value::String(s) => s.clone(),
                        Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    (k.clone(), cell)
                })
                .collect()
        })
        .collect();

    normalize(&rows, schema)
}

/// Parse and normalize in one step.
pub fn normalize_csv(text: &str, schema: &Schema) -> Result<Vec<NormalizedRecord>> {
    let rows = parse_csv(text)?;
    Ok(normalize(&rows, schema))
}

fn normalize_row(row: &RawRow, schema: &Schema, defaulted: &mut usize) -> NormalizedRecord {
    let mut record = NormalizedRecord::new();
    for field in schema.fields {
        let cell = lookup(row, field);
        let value = coerce(cell, field).unwrap_or_else(|| {
            *defaulted += 1;
            trace!(
                field = field.key,
                cell = cell.unwrap_or(""),
                "defaulting unreadable cell"
            );
            default_for(field.kind)
        });
        record.insert(field.key, value);
    }
    record
}

/// Find the cell for `field`, preferring an exact header match and falling
/// back to a trimmed, case-insensitive one.
fn lookup<'a>(row: &'a RawRow, field: &FieldSpec) -> Option<&'a str> {
    for header in field.headers {
        if let Some(v) = row.get(*header) {
            return Some(v.as_str());
        }
    }
    for header in field.headers {
        let found = row
            .iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(header));
        if let Some((_, v)) = found {
            return Some(v.as_str());
        }
    }
    None
}

/// Coerce a cell; `None` means the field default applies.
fn coerce(cell: Option<&str>, field: &FieldSpec) -> Option<FieldValue> {
    let raw = cell?.trim();
    if raw.is_empty() {
        return None;
    }
    match field.kind {
        FieldKind::Text | FieldKind::Date => Some(FieldValue::Text(raw.to_string())),
        FieldKind::Count => {
            let n = parse_number(raw)?;
            if n < 0.0 {
                return None;
            }
            Some(FieldValue::Count(n.round() as u64))
        }
        FieldKind::Number => parse_number(raw).map(FieldValue::Number),
        FieldKind::Rate => {
            // A trailing '%' means the export already wrote a percentage.
            if let Some(pct) = raw.strip_suffix('%') {
                return parse_number(pct).map(FieldValue::Number);
            }
            parse_number(raw).map(|f| FieldValue::Number(f * 100.0))
        }
    }
}

fn default_for(kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Text | FieldKind::Date => FieldValue::Text(UNKNOWN.to_string()),
        FieldKind::Count => FieldValue::Count(0),
        FieldKind::Number | FieldKind::Rate => FieldValue::Number(0.0),
    }
}

/// Parse an integer or float, tolerating thousands separators and spaces.
fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
