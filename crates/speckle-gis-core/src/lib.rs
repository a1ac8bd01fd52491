//! Speckle GIS Core
//!
//! Attribute reconciliation between Speckle objects and GIS feature schemas.
//!
//! Speckle objects carry arbitrary, possibly nested attributes; a GIS feature
//! layer declares a flat list of fields, each with one of four types. This
//! crate maps the former onto the latter:
//!
//! - **Classifier** ([`classify`]): the natural [`FieldTag`] of a value.
//! - **Coercion** ([`coerce`], [`FieldCoercer`]): fits a value into a declared
//!   field type, truncating long text and nulling what cannot be converted.
//! - **Flattening** ([`flatten`], [`Flattener`]): expands nested attributes
//!   into `root_suffix` keyed scalars.
//! - **Assembly** ([`RecordAssembler`]): builds one sorted output record per
//!   source object, covering every schema field.
//! - **Extrusion** ([`HeightResolver`]): polygon heights from saved layer
//!   transforms.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use speckle_gis_core::{
//!     FieldTag, FieldValue, JsonSourceRecord, MemorySink, RecordAssembler, ReconcileConfig,
//!     Schema,
//! };
//!
//! let config = ReconcileConfig::default();
//! let sink = MemorySink::new();
//! let assembler = RecordAssembler::new(&config, &sink);
//!
//! let schema = Schema::from_pairs([
//!     ("Speckle_ID", FieldTag::Text),
//!     ("Elevation_0", FieldTag::Float),
//! ]);
//! let source = JsonSourceRecord::from_value(json!({
//!     "id": "abc123",
//!     "Elevation": [12.5],
//! }))
//! .unwrap();
//!
//! let record = assembler.assemble(&schema, &source).unwrap();
//! assert_eq!(record["Elevation_0"], Some(FieldValue::Float(12.5)));
//! ```

pub mod assemble;
pub mod coerce;
pub mod config;
pub mod error;
pub mod extrusion;
pub mod field;
pub mod flatten;
pub mod log;
pub mod value;

pub use assemble::{Assembly, FieldReport, FieldSource, JsonSourceRecord, RecordAssembler, SourceRecord};
pub use coerce::{coerce, Coerced, CoercionRule, FieldCoercer};
pub use config::ReconcileConfig;
pub use error::{AssembleError, CoercionError, ConfigError, LookupError};
pub use extrusion::{HeightResolver, LayerContext, SavedTransform};
pub use field::{classify, FieldTag, FieldValue, OutputRecord, Schema, SchemaField};
pub use flatten::{flatten, Flattened, Flattener, SkippedBranch};
pub use log::{LogEntry, LogLevel, LogSink, MemorySink, TracingSink};
pub use value::AttributeValue;
