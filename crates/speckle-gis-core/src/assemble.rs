//! Record assembly: one Speckle object in, one feature row out
//!
//! For every field of the target schema the assembler finds a value on the
//! source record, coerces it to the declared type and stores it. The output
//! always carries exactly the schema's field names; anything that cannot be
//! found or converted is null.
//!
//! Lookup order per field:
//!
//! 1. The identity field (`Speckle_ID` by default) takes the record's id.
//! 2. A direct attribute with the same name.
//! 3. A nested attribute: the name is read as `root_suffix`, `root` is
//!    flattened and the exact field name is looked up in the result. Roots
//!    are tried shortest first, so `Elevation_min_0` tries `Elevation`, then
//!    `Elevation_min`.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::coerce::{CoercionRule, FieldCoercer};
use crate::config::ReconcileConfig;
use crate::error::{AssembleError, LookupError};
use crate::field::{OutputRecord, Schema};
use crate::flatten::{Flattened, Flattener};
use crate::log::{LogLevel, LogSink};
use crate::value::AttributeValue;

const ORIGIN: &str = "assemble_record";

/// Read access to a dynamic source object
pub trait SourceRecord {
    /// Attribute value for `key`, or `LookupError::NotFound`.
    ///
    /// A present attribute holding null must return `Ok(AttributeValue::Null)`
    /// so it is not mistaken for a missing one.
    fn get(&self, key: &str) -> Result<AttributeValue, LookupError>;

    /// Identity of the object (the Speckle object id)
    fn identity(&self) -> Result<String, LookupError>;
}

/// Source record backed by a JSON object, such as a serialized Speckle `Base`
#[derive(Debug, Clone)]
pub struct JsonSourceRecord {
    object: Map<String, JsonValue>,
    sentinels: Vec<String>,
}

impl JsonSourceRecord {
    pub fn new(object: Map<String, JsonValue>) -> Self {
        Self {
            object,
            sentinels: Vec::new(),
        }
    }

    /// Wrap a JSON value; returns `None` unless it is an object
    pub fn from_value(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(object) => Some(Self::new(object)),
            _ => None,
        }
    }

    /// Treat these strings as null wherever they appear
    pub fn with_sentinels(mut self, sentinels: Vec<String>) -> Self {
        self.sentinels = sentinels;
        self
    }
}

impl SourceRecord for JsonSourceRecord {
    fn get(&self, key: &str) -> Result<AttributeValue, LookupError> {
        self.object
            .get(key)
            .map(|v| AttributeValue::from_json_with_sentinels(v, &self.sentinels))
            .ok_or_else(|| LookupError::NotFound(key.to_string()))
    }

    fn identity(&self) -> Result<String, LookupError> {
        match self.object.get("id") {
            Some(JsonValue::String(id)) => Ok(id.clone()),
            Some(JsonValue::Null) | None => Err(LookupError::MissingIdentity),
            Some(other) => Ok(other.to_string()),
        }
    }
}

impl SourceRecord for BTreeMap<String, AttributeValue> {
    fn get(&self, key: &str) -> Result<AttributeValue, LookupError> {
        BTreeMap::get(self, key)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(key.to_string()))
    }

    fn identity(&self) -> Result<String, LookupError> {
        match BTreeMap::get(self, "id") {
            Some(AttributeValue::Null) | None => Err(LookupError::MissingIdentity),
            Some(id) => Ok(id.to_text()),
        }
    }
}

/// Where a field's value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    Identity,
    Direct,
    Flattened { root: String },
    Missing,
}

/// How one schema field was filled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldReport {
    pub name: String,
    pub source: FieldSource,
    /// `None` when coercion failed and the field was forced to null
    pub rule: Option<CoercionRule>,
}

/// An assembled record together with its per-field report
#[derive(Debug, Clone, Default, Serialize)]
pub struct Assembly {
    pub record: OutputRecord,
    pub fields: Vec<FieldReport>,
}

/// Builds output records for a target schema
pub struct RecordAssembler<'a> {
    config: &'a ReconcileConfig,
    sink: &'a dyn LogSink,
}

impl<'a> RecordAssembler<'a> {
    pub fn new(config: &'a ReconcileConfig, sink: &'a dyn LogSink) -> Self {
        Self { config, sink }
    }

    /// Assemble a record. An `Err` means the record should be skipped.
    pub fn assemble(
        &self,
        schema: &Schema,
        source: &dyn SourceRecord,
    ) -> Result<OutputRecord, AssembleError> {
        self.assemble_with_report(schema, source).map(|a| a.record)
    }

    /// Assemble a record and report how each field was filled
    pub fn assemble_with_report(
        &self,
        schema: &Schema,
        source: &dyn SourceRecord,
    ) -> Result<Assembly, AssembleError> {
        if let Err(e) = validate_schema(schema) {
            self.sink.log(&e.to_string(), LogLevel::Error, ORIGIN);
            return Err(e);
        }

        let coercer = FieldCoercer::new(self.config, self.sink);
        let mut nested = NestedLookup::new(Flattener::new(self.config.max_flatten_depth), self.sink);
        let mut assembly = Assembly::default();

        for field in &schema.fields {
            let (value, field_source) = if field.name == self.config.identity_field {
                match source.identity() {
                    Ok(id) => (Some(AttributeValue::Text(id)), FieldSource::Identity),
                    Err(e) => {
                        tracing::debug!(field = %field.name, error = %e, "No identity on source record");
                        (None, FieldSource::Missing)
                    }
                }
            } else {
                match source.get(&field.name) {
                    Ok(value) => (Some(value), FieldSource::Direct),
                    Err(_) => match nested.find(source, &field.name) {
                        Some((value, root)) => (Some(value), FieldSource::Flattened { root }),
                        None => (None, FieldSource::Missing),
                    },
                }
            };

            let rule = match value {
                Some(value) => {
                    let rule = coercer.coerce_into(&mut assembly.record, &field.name, field.tag, &value);
                    if rule.is_none() {
                        assembly.record.insert(field.name.clone(), None);
                    }
                    rule
                }
                None => {
                    assembly.record.insert(field.name.clone(), None);
                    Some(CoercionRule::Null)
                }
            };

            assembly.fields.push(FieldReport {
                name: field.name.clone(),
                source: field_source,
                rule,
            });
        }

        tracing::debug!(fields = assembly.fields.len(), "Assembled record");
        Ok(assembly)
    }
}

fn validate_schema(schema: &Schema) -> Result<(), AssembleError> {
    let mut seen = HashSet::new();
    for (i, field) in schema.fields.iter().enumerate() {
        if field.name.is_empty() {
            return Err(AssembleError::EmptyFieldName(i));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(AssembleError::DuplicateField(field.name.clone()));
        }
    }
    Ok(())
}

/// Resolves `root_suffix` field names against flattened root attributes,
/// flattening each root at most once per record
struct NestedLookup<'s> {
    flattener: Flattener,
    sink: &'s dyn LogSink,
    cache: HashMap<String, Option<Flattened>>,
}

impl<'s> NestedLookup<'s> {
    fn new(flattener: Flattener, sink: &'s dyn LogSink) -> Self {
        Self {
            flattener,
            sink,
            cache: HashMap::new(),
        }
    }

    fn find(&mut self, source: &dyn SourceRecord, name: &str) -> Option<(AttributeValue, String)> {
        for (i, _) in name.match_indices('_') {
            let root = &name[..i];
            if root.is_empty() {
                continue;
            }
            if let Some(flattened) = self.flattened(source, root) {
                if let Some(value) = flattened.values.get(name) {
                    return Some((value.clone(), root.to_string()));
                }
            }
        }
        None
    }

    fn flattened(&mut self, source: &dyn SourceRecord, root: &str) -> Option<&Flattened> {
        if !self.cache.contains_key(root) {
            let entry = source.get(root).ok().map(|value| {
                let flattened = self.flattener.flatten(root, &value);
                for skipped in &flattened.skipped {
                    self.sink.log(
                        &format!("Nested attribute \"{}\" skipped: {}", skipped.path, skipped.reason),
                        LogLevel::Warning,
                        ORIGIN,
                    );
                }
                flattened
            });
            self.cache.insert(root.to_string(), entry);
        }
        self.cache.get(root).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldTag, FieldValue};
    use crate::log::MemorySink;
    use serde_json::json;

    fn source(value: JsonValue) -> JsonSourceRecord {
        JsonSourceRecord::from_value(value)
            .unwrap()
            .with_sentinels(ReconcileConfig::default().null_sentinels)
    }

    #[test]
    fn test_empty_schema_yields_empty_record() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);

        let record = assembler
            .assemble(&Schema::default(), &source(json!({"id": "a", "x": 1})))
            .unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_identity_field() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("Speckle_ID", FieldTag::Text)]);

        let record = assembler
            .assemble(&schema, &source(json!({"id": "abc123", "Speckle_ID": "other"})))
            .unwrap();
        assert_eq!(record["Speckle_ID"], Some(FieldValue::Text("abc123".to_string())));
    }

    #[test]
    fn test_flatten_fallback() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("Elevation_0", FieldTag::Float)]);

        let assembly = assembler
            .assemble_with_report(&schema, &source(json!({"id": "a", "Elevation": [12.5]})))
            .unwrap();

        assert_eq!(assembly.record["Elevation_0"], Some(FieldValue::Float(12.5)));
        assert_eq!(
            assembly.fields[0].source,
            FieldSource::Flattened { root: "Elevation".to_string() }
        );
    }

    #[test]
    fn test_longer_root_tried_when_short_root_absent() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("floor_area_total", FieldTag::Integer32)]);

        let record = assembler
            .assemble(&schema, &source(json!({"floor_area": {"total": 40.7}})))
            .unwrap();
        assert_eq!(record["floor_area_total"], Some(FieldValue::Integer32(40)));
    }

    #[test]
    fn test_missing_and_sentinel_fields_are_null() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([
            ("name", FieldTag::Text),
            ("absent", FieldTag::Float),
            ("Speckle_ID", FieldTag::Text),
        ]);

        let assembly = assembler
            .assemble_with_report(&schema, &source(json!({"name": "NULL"})))
            .unwrap();

        assert_eq!(assembly.record.len(), 3);
        assert!(assembly.record.values().all(Option::is_none));
        assert_eq!(assembly.fields[1].source, FieldSource::Missing);
        assert_eq!(assembly.fields[2].source, FieldSource::Missing);
    }

    #[test]
    fn test_output_keys_sorted() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([
            ("zeta", FieldTag::Text),
            ("alpha", FieldTag::Text),
            ("Mid", FieldTag::Text),
        ]);

        let record = assembler.assemble(&schema, &source(json!({}))).unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_failed_coercion_forced_null() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("count", FieldTag::Integer32)]);

        let assembly = assembler
            .assemble_with_report(&schema, &source(json!({"count": 1e300})))
            .unwrap();

        assert_eq!(assembly.record["count"], None);
        assert_eq!(assembly.fields[0].rule, None);
        assert_eq!(sink.at_least(LogLevel::Warning).len(), 1);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("a", FieldTag::Text), ("a", FieldTag::Float)]);

        let result = assembler.assemble(&schema, &source(json!({})));
        assert_eq!(result, Err(AssembleError::DuplicateField("a".to_string())));
        assert_eq!(sink.at_least(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_btreemap_source() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("Speckle_ID", FieldTag::Text), ("n", FieldTag::Float)]);

        let mut map = BTreeMap::new();
        map.insert("id".to_string(), AttributeValue::from("xyz"));
        map.insert("n".to_string(), AttributeValue::Integer(2));

        let record = assembler.assemble(&schema, &map).unwrap();
        assert_eq!(record["Speckle_ID"], Some(FieldValue::Text("xyz".to_string())));
        assert_eq!(record["n"], Some(FieldValue::Float(2.0)));
    }

    #[test]
    fn test_sentinel_text_from_any_source_is_null() {
        let config = ReconcileConfig::default();
        let sink = MemorySink::new();
        let assembler = RecordAssembler::new(&config, &sink);
        let schema = Schema::from_pairs([("label", FieldTag::Text), ("rooms", FieldTag::Integer32)]);

        let mut map = BTreeMap::new();
        map.insert("label".to_string(), AttributeValue::from("NULL"));
        map.insert("rooms".to_string(), AttributeValue::from("None"));

        let record = assembler.assemble(&schema, &map).unwrap();
        assert_eq!(record["label"], None);
        assert_eq!(record["rooms"], None);
    }
}
