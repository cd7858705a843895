//! Schema completeness and retry-fill merging. Pure functions.

use serde_json::{Map, Value};

use crate::interview::SchemaField;

/// Schema fields absent from `record` or set to null, in schema order.
pub fn missing_fields(schema: &[SchemaField], record: &Map<String, Value>) -> Vec<String> {
    schema
        .iter()
        .filter(|field| record.get(&field.name).is_none_or(Value::is_null))
        .map(|field| field.name.clone())
        .collect()
}

/// Merge a fill response into `record`.
///
/// Only fields in `requested` are taken from `partial`, only non-null values
/// are taken, and a field that already holds a non-null value is never
/// overwritten. Returns how many fields were filled.
pub fn merge_missing(
    record: &mut Map<String, Value>,
    partial: &Map<String, Value>,
    requested: &[String],
) -> usize {
    let mut filled = 0;
    for name in requested {
        let Some(value) = partial.get(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let slot = record.entry(name.clone()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = value.clone();
            filled += 1;
        }
    }
    filled
}
