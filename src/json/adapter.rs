//! Extraction, injection, and validation over JSON skeletons.
//!
//! The safe zone for generic JSON is implicit: every string leaf reachable
//! through object keys or array indices, skipping blank strings. Output
//! preserves original key order (serde_json's `preserve_order` feature) and
//! pretty-prints with two-space indentation.

use crate::adapter::DocumentAdapter;
use crate::differ::{self, AddressEntry};
use crate::error::ParseError;
use crate::item::{EditSet, ExtractionItem};
use crate::json::path::{append_index, append_key};
use crate::report::{IssueKind, ValidationReport};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct JsonAdapter;

impl JsonAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// One string leaf: (pointer, context, text), in document order.
fn string_leaves(value: &Value) -> Vec<(String, String, String)> {
    let mut out = Vec::new();
    walk(value, "", None, &mut out);
    out
}

fn walk(value: &Value, pointer: &str, key: Option<&str>, out: &mut Vec<(String, String, String)>) {
    match value {
        Value::Object(map) => {
            for (child_key, child) in map {
                walk(child, &append_key(pointer, child_key), Some(child_key), out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, &append_index(pointer, index), key, out);
            }
        }
        Value::String(text) => {
            if !text.trim().is_empty() {
                let context = key.unwrap_or("document").to_string();
                out.push((pointer.to_string(), context, text.clone()));
            }
        }
        _ => {}
    }
}

fn parse_value(source: &[u8]) -> Result<Value, ParseError> {
    serde_json::from_slice(source).map_err(|err| ParseError::invalid_json(err.to_string()))
}

impl DocumentAdapter for JsonAdapter {
    fn extract(&self, source: &[u8]) -> Result<Vec<ExtractionItem>, ParseError> {
        let value = parse_value(source)?;
        Ok(string_leaves(&value)
            .into_iter()
            .map(|(pointer, context, text)| ExtractionItem::new(pointer, context, text))
            .collect())
    }

    fn inject(&self, skeleton: &[u8], edits: &EditSet) -> Result<Vec<u8>, ParseError> {
        let mut value = parse_value(skeleton)?;

        // The skeleton's own leaves are the authoritative address set; edit
        // ids outside it are skipped, and a pointer that exists but is not a
        // string leaf is not an addressable position.
        for (pointer, _, _) in string_leaves(&value) {
            let new_text = match edits.get(&pointer) {
                Some(text) => text,
                None => continue,
            };
            if let Some(slot) = value.pointer_mut(&pointer) {
                *slot = Value::String(new_text.to_string());
            }
        }

        let rendered = serde_json::to_string_pretty(&value)
            .map_err(|err| ParseError::invalid_json(err.to_string()))?;
        Ok(rendered.into_bytes())
    }

    fn validate(&self, skeleton: &[u8], modifications: &[u8]) -> ValidationReport {
        let value = match parse_value(skeleton) {
            Ok(value) => value,
            Err(err) => {
                return ValidationReport::parse_failure(IssueKind::InvalidJson, err.to_string());
            }
        };

        let records = match differ::parse_modifications(modifications) {
            Ok(records) => records,
            Err(err) => {
                return ValidationReport::parse_failure(IssueKind::InvalidJson, err.to_string());
            }
        };

        let addresses: Vec<AddressEntry> = string_leaves(&value)
            .into_iter()
            .map(|(pointer, context, text)| AddressEntry {
                id: pointer,
                context,
                text,
            })
            .collect();

        differ::reconcile(&addresses, &records)
    }
}
