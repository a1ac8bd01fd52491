//! Dynamic attribute values read from Speckle objects

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// A heterogeneous attribute value as it arrives from a source record
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<AttributeValue>),
    Object(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Convert a JSON value, mapping any string in `sentinels` to `Null`.
    ///
    /// Conversion is recursive so sentinels nested inside lists and objects
    /// are also recognised.
    pub fn from_json_with_sentinels(value: &JsonValue, sentinels: &[String]) -> Self {
        match value {
            JsonValue::Null => AttributeValue::Null,
            JsonValue::Bool(b) => AttributeValue::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    AttributeValue::Integer(i)
                } else {
                    AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => {
                if sentinels.iter().any(|sentinel| sentinel == s) {
                    AttributeValue::Null
                } else {
                    AttributeValue::Text(s.clone())
                }
            }
            JsonValue::Array(items) => AttributeValue::List(
                items
                    .iter()
                    .map(|item| Self::from_json_with_sentinels(item, sentinels))
                    .collect(),
            ),
            JsonValue::Object(map) => AttributeValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json_with_sentinels(v, sentinels)))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Whether this value has members to flatten
    pub fn is_composite(&self) -> bool {
        matches!(self, AttributeValue::List(_) | AttributeValue::Object(_))
    }

    /// Name of the runtime type, for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::Text(_) => "text",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Float(_) => "float",
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::List(_) => "list",
            AttributeValue::Object(_) => "object",
        }
    }

    /// Render the value the way a text field stores it
    pub fn to_text(&self) -> String {
        match self {
            AttributeValue::Null => String::new(),
            AttributeValue::Text(s) => s.clone(),
            AttributeValue::Integer(i) => i.to_string(),
            AttributeValue::Float(f) => format_float(*f),
            AttributeValue::Boolean(true) => "True".to_string(),
            AttributeValue::Boolean(false) => "False".to_string(),
            AttributeValue::List(_) | AttributeValue::Object(_) => self.to_json().to_string(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            AttributeValue::Null => JsonValue::Null,
            AttributeValue::Text(s) => JsonValue::String(s.clone()),
            AttributeValue::Integer(i) => JsonValue::from(*i),
            AttributeValue::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number)
            }
            AttributeValue::Boolean(b) => JsonValue::Bool(*b),
            AttributeValue::List(items) => {
                JsonValue::Array(items.iter().map(AttributeValue::to_json).collect())
            }
            AttributeValue::Object(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&JsonValue> for AttributeValue {
    fn from(value: &JsonValue) -> Self {
        Self::from_json_with_sentinels(value, &[])
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Floats always keep a fractional part so `3.0` does not read back as an integer.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
