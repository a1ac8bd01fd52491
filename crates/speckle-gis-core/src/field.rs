//! Feature-layer field schema and the type classifier
//!
//! GIS layers declare one of four coarse field types. Values coming from
//! Speckle objects are classified into the same four tags so they can be
//! compared against the declaration.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, Result};
use crate::value::{format_float, AttributeValue};

/// Declared type of a feature-layer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldTag {
    #[serde(rename = "TEXT", alias = "STRING", alias = "text", alias = "string")]
    Text,
    #[serde(rename = "LONG", alias = "INTEGER", alias = "long", alias = "integer32")]
    Integer32,
    #[serde(rename = "SHORT", alias = "short", alias = "integer16")]
    Integer16,
    #[serde(rename = "FLOAT", alias = "DOUBLE", alias = "float", alias = "double")]
    Float,
}

impl FieldTag {
    /// Esri field type keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTag::Text => "TEXT",
            FieldTag::Integer32 => "LONG",
            FieldTag::Integer16 => "SHORT",
            FieldTag::Float => "FLOAT",
        }
    }

    /// Map a QGIS `QVariant` type code onto a field tag.
    ///
    /// Only the codes QGIS layers actually use for attributes are recognised:
    /// `2` (Int), `4` (LongLong), `6` (Double) and `10` (String).
    pub fn from_qvariant(code: i32) -> Option<Self> {
        match code {
            10 => Some(FieldTag::Text),
            2 | 4 => Some(FieldTag::Integer32),
            6 => Some(FieldTag::Float),
            _ => None,
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TEXT" | "STRING" => Ok(FieldTag::Text),
            "LONG" | "INTEGER" | "INTEGER32" => Ok(FieldTag::Integer32),
            "SHORT" | "INTEGER16" => Ok(FieldTag::Integer16),
            "FLOAT" | "DOUBLE" => Ok(FieldTag::Float),
            _ => Err(format!("Unknown field type: {}", s)),
        }
    }
}

/// Infer the field tag a value would naturally be stored under.
///
/// Never fails: shapes without a natural GIS type (null, lists, objects)
/// classify as `Text`, since anything can be stringified.
pub fn classify(value: &AttributeValue) -> FieldTag {
    match value {
        AttributeValue::Integer(_) => FieldTag::Integer32,
        AttributeValue::Float(_) => FieldTag::Float,
        AttributeValue::Boolean(_) => FieldTag::Integer16,
        AttributeValue::Text(_)
        | AttributeValue::Null
        | AttributeValue::List(_)
        | AttributeValue::Object(_) => FieldTag::Text,
    }
}

/// A single field of a target feature layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type", alias = "tag")]
    pub tag: FieldTag,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, tag: FieldTag) -> Self {
        Self {
            name: name.into(),
            tag,
        }
    }
}

/// Ordered field list of a target feature layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub fields: Vec<SchemaField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    List(Vec<SchemaField>),
    Table { fields: Vec<SchemaField> },
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let fields = match SchemaFile::deserialize(deserializer)? {
            SchemaFile::List(fields) => fields,
            SchemaFile::Table { fields } => fields,
        };
        Ok(Schema { fields })
    }
}

impl Schema {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Build a schema from `(name, tag)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldTag)>,
        S: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, tag)| SchemaField::new(name, tag))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Load a schema file, picking the parser from the extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") | None => Ok(serde_json::from_str(&content)?),
            Some(other) => Err(ConfigError::Parse(format!(
                "Unsupported schema file extension: .{}",
                other
            ))),
        }
    }
}

/// A value conforming to its field's declared tag
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer32(i32),
    Integer16(i16),
    Float(f64),
}

impl FieldValue {
    pub fn tag(&self) -> FieldTag {
        match self {
            FieldValue::Text(_) => FieldTag::Text,
            FieldValue::Integer32(_) => FieldTag::Integer32,
            FieldValue::Integer16(_) => FieldTag::Integer16,
            FieldValue::Float(_) => FieldTag::Float,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer32(i) => write!(f, "{}", i),
            FieldValue::Integer16(i) => write!(f, "{}", i),
            FieldValue::Float(v) => f.write_str(&format_float(*v)),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Integer32(i) => serializer.serialize_i32(*i),
            FieldValue::Integer16(i) => serializer.serialize_i16(*i),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
        }
    }
}

/// Reconciled feature attributes, keyed and iterated in lexicographic order
pub type OutputRecord = BTreeMap<String, Option<FieldValue>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_scalars() {
        assert_eq!(classify(&AttributeValue::from("a")), FieldTag::Text);
        assert_eq!(classify(&AttributeValue::Integer(3)), FieldTag::Integer32);
        assert_eq!(classify(&AttributeValue::Float(3.5)), FieldTag::Float);
        assert_eq!(classify(&AttributeValue::Boolean(true)), FieldTag::Integer16);
        assert_eq!(classify(&AttributeValue::Null), FieldTag::Text);
    }

    #[test]
    fn test_classify_composite_is_best_guess_text() {
        assert_eq!(classify(&AttributeValue::List(vec![])), FieldTag::Text);
        assert_eq!(classify(&AttributeValue::Object(BTreeMap::new())), FieldTag::Text);
    }

    #[test]
    fn test_field_tag_parse_and_display() {
        assert_eq!("long".parse::<FieldTag>().unwrap(), FieldTag::Integer32);
        assert_eq!("DOUBLE".parse::<FieldTag>().unwrap(), FieldTag::Float);
        assert!("BLOB".parse::<FieldTag>().is_err());
        assert_eq!(FieldTag::Integer16.to_string(), "SHORT");
    }

    #[test]
    fn test_qvariant_codes() {
        assert_eq!(FieldTag::from_qvariant(10), Some(FieldTag::Text));
        assert_eq!(FieldTag::from_qvariant(4), Some(FieldTag::Integer32));
        assert_eq!(FieldTag::from_qvariant(6), Some(FieldTag::Float));
        assert_eq!(FieldTag::from_qvariant(99), None);
    }

    #[test]
    fn test_schema_deserialize_list_and_table() {
        let from_list: Schema =
            serde_json::from_str(r#"[{"name": "height", "type": "FLOAT"}]"#).unwrap();
        let from_table: Schema = toml::from_str(
            r#"
            [[fields]]
            name = "height"
            type = "DOUBLE"
            "#,
        )
        .unwrap();

        assert_eq!(from_list, from_table);
        assert_eq!(from_list.get("height").unwrap().tag, FieldTag::Float);
    }

    #[test]
    fn test_field_value_serializes_plain() {
        let mut record = OutputRecord::new();
        record.insert("b".to_string(), Some(FieldValue::Integer32(4)));
        record.insert("a".to_string(), None);
        record.insert("c".to_string(), Some(FieldValue::Float(1.5)));

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"a":null,"b":4,"c":1.5}"#);
    }
}
