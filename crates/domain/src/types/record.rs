//! Records returned by the ERP.
//!
//! A record is the JSON object the ERP returned for one document, kept as-is.
//! Only the identifier (`name`) and the last-modified timestamp (`modified`)
//! are interpreted.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::ERP_TIMESTAMP_FORMAT;
use crate::CampusBridgeError;

const ID_FIELD: &str = "name";
const MODIFIED_FIELD: &str = "modified";

/// One ERP document as a field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Document identifier (`name` in ERPNext).
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID_FIELD)
    }

    /// Last-modified timestamp, when present and parseable.
    pub fn modified(&self) -> Option<NaiveDateTime> {
        self.get_str(MODIFIED_FIELD).and_then(parse_erp_timestamp)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = CampusBridgeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(CampusBridgeError::InvalidInput(format!(
                "expected a JSON object for a record, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Parse an ERPNext timestamp (`2024-03-01 08:15:00.123456`).
///
/// Also accepts the `T`-separated form and bare dates (midnight).
pub fn parse_erp_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, ERP_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a timestamp the way ERPNext stores it (microsecond precision).
pub fn format_erp_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
