use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Document holding the last saved match.
pub const LAST_MATCH_DOC_ID: &str = "scoreboard::last-match";
/// Document holding the settings record.
pub const SETTINGS_DOC_ID: &str = "scoreboard::settings";

/// Record wrapped with the CouchDB bookkeeping fields.
///
/// The body stays untyped so loads can be reconciled field by field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRecordDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl CouchRecordDocument {
    /// Wrap an encoded record. Non-object values are stored under `value`.
    pub fn new(id: &str, rev: Option<String>, record: Value) -> Self {
        let body = match record {
            Value::Object(map) => map,
            other => Map::from_iter([("value".to_string(), other)]),
        };
        Self {
            id: id.to_string(),
            rev,
            body,
        }
    }

    /// Strip the bookkeeping fields and return the record itself.
    pub fn into_record(self) -> Value {
        Value::Object(self.body)
    }
}
