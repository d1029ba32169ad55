//! Data records and binding resolution.
//!
//! An element property bound to a record field takes the record's value
//! whenever the field is present, even as an empty string. Otherwise the
//! authored property is used. Resolution never fails and is never cached on
//! the element; callers re-resolve whenever the active record changes.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::Element;

/// A flat record of field name to string value.
pub type DataRecord = BTreeMap<String, String>;

/// Fields offered by the single-card data form.
pub const RECORD_FIELDS: [&str; 7] = ["name", "role", "id", "qrPayload", "school", "logo", "photo"];

/// Resolve the effective value of `property` on `element` against `record`.
#[must_use]
pub fn resolve(element: &Element, property: &str, record: &DataRecord) -> Option<Value> {
    if let Some(value) = element
        .bindings()
        .get(property)
        .filter(|field| !field.is_empty())
        .and_then(|field| record.get(field))
    {
        return Some(Value::String(value.clone()));
    }
    element.prop(property)
}

/// Resolve `property` as display text. Numbers and booleans are formatted,
/// anything unresolved or structured yields `None`.
#[must_use]
pub fn resolve_text(element: &Element, property: &str, record: &DataRecord) -> Option<String> {
    match resolve(element, property, record)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Normalise a batch of parsed rows so every row carries every header.
///
/// Headers keep their first-seen order; absent cells become empty strings.
#[must_use]
pub fn normalize_rows(rows: Vec<BTreeMap<String, String>>) -> (Vec<String>, Vec<DataRecord>) {
    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    let rows = rows
        .into_iter()
        .map(|mut row| {
            for header in &headers {
                row.entry(header.clone()).or_default();
            }
            row
        })
        .collect();
    (headers, rows)
}
