//! Queue message envelope carrying one CSV row from parser to consumer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A parsed CSV row keyed by header name. Values stay untyped text.
pub type CsvRow = BTreeMap<String, String>;

/// Message written to the work queue once per CSV row.
///
/// Wire format: `{"data": {...}, "processedAt": "<ISO-8601>", "productIndex": N}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueuedProductMessage {
    pub data: CsvRow,
    pub processed_at: String,
    pub product_index: usize,
}

/// Lenient view of a queue body as seen by the consumer.
///
/// Field values may arrive as JSON strings or numbers; the envelope metadata
/// is optional because only `data` drives persistence.
#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InboundProductMessage {
    pub data: Map<String, Value>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default)]
    pub product_index: Option<usize>,
}

impl InboundProductMessage {
    /// Literal textual form of a field, or `None` when absent or null.
    ///
    /// Numbers keep their JSON spelling, so `99.90` sent as a string stays
    /// `"99.90"` while a numeric `10` becomes `"10"`.
    pub fn field_text(&self, field: &str) -> Option<String> {
        value_text(self.data.get(field)?)
    }
}

/// Literal text of a JSON value: strings as-is, other values in their JSON
/// spelling, `null` as `None`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
