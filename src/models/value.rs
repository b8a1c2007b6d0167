use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::Value as Json;

/// A single record field value, tagged by the wire representation it owns
/// rather than stored as a loosely-typed `serde_json::Value` throughout —
/// the registry already carries the
/// schema needed to drive both parsing and emission, so the in-memory shape
/// should make the cases the wire format distinguishes (string-encoded
/// decimal vs. JSON number, parsed JSON vs. opaque string) impossible to
/// confuse.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    /// RFC3339-formatted, stored and emitted verbatim.
    Datetime(String),
    Json(Json),
    /// Decimal values are carried as their exact string representation end
    /// to end; parsing into a float would risk losing the scale guarantee this
    /// type promises (`"199.99" -> "199.99"`, never `199.99000001`).
    Decimal(String),
    Null,
}

impl RecordValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RecordValue::Null)
    }
}

impl Serialize for RecordValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RecordValue::String(s) => serializer.serialize_str(s),
            RecordValue::Integer(i) => serializer.serialize_i64(*i),
            RecordValue::Boolean(b) => serializer.serialize_bool(*b),
            RecordValue::Datetime(s) => serializer.serialize_str(s),
            RecordValue::Json(v) => v.serialize(serializer),
            RecordValue::Decimal(s) => serializer.serialize_str(s),
            RecordValue::Null => serializer.serialize_none(),
        }
    }
}

/// A mapping from column name to value, conforming to its collection's
/// schema.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Record(pub BTreeMap<String, RecordValue>);

impl Record {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RecordValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&RecordValue> {
        self.0.get(key)
    }
}
