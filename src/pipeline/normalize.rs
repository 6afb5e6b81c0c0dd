//! Raw record normalization.
//!
//! Maps a source-specific raw record into the canonical [`Listing`]
//! schema, driven entirely by the source's [`FieldMap`]. Defaults for
//! missing optional fields: empty string for text, 0 for the price.
//! Only a missing identity field fails the record.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{FieldMap, Listing};

/// Normalizes raw records for one source.
pub struct RecordNormalizer {
    source: String,
    fields: FieldMap,
    fetched_at: DateTime<Utc>,
    price_digits: Regex,
}

impl RecordNormalizer {
    /// Create a normalizer for one source. All listings it produces
    /// carry the same `fetched_at` stamp for the run.
    pub fn new(source: impl Into<String>, fields: FieldMap, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            fields,
            fetched_at,
            price_digits: Regex::new(r"\d").expect("digit pattern is valid"),
        }
    }

    /// Map one raw record into a canonical listing.
    pub fn normalize(&self, raw: &Value) -> Result<Listing> {
        let id = resolve_path(raw, &self.fields.id)
            .map(text_of)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::malformed(format!("record has no '{}' field", self.fields.id))
            })?;

        let name = self
            .fields
            .name
            .iter()
            .filter_map(|path| resolve_path(raw, path))
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let price = resolve_path(raw, &self.fields.price)
            .and_then(|value| coerce_price(value, &self.price_digits))
            .unwrap_or(0);

        let attributes = self
            .fields
            .attributes
            .iter()
            .map(|(canonical, path)| {
                let value = resolve_path(raw, path).map(text_of).unwrap_or_default();
                (canonical.clone(), value)
            })
            .collect();

        Ok(Listing {
            source: self.source.clone(),
            id,
            name,
            price,
            attributes,
            fetched_at: self.fetched_at,
        })
    }
}

/// Resolve a dot-separated path into a JSON value.
fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Render a JSON scalar as text. Objects and arrays have no text form.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Coerce an upstream price value to an integer.
///
/// Accepts plain integers, floats (truncated), strings with currency
/// noise ("₹5,50,000" -> 550000), and objects whose first numeric
/// member carries the value.
fn coerce_price(value: &Value, digits: &Regex) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let joined: String = digits.find_iter(s).map(|m| m.as_str()).collect();
            joined.parse().ok()
        }
        Value::Object(map) => map.values().find_map(|v| coerce_price(v, digits)),
        _ => None,
    }
}
