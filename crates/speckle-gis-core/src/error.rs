//! Error types for attribute reconciliation
//!
//! Every failure here is recoverable by the caller: lookup misses drive the
//! flatten fallback, coercion failures null a single field, and assembly
//! failures mean "skip this record".

use thiserror::Error;

use crate::field::FieldTag;

/// A source record could not produce a value for a key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The key is not present on the source record
    #[error("Attribute not found: {0}")]
    NotFound(String),

    /// The source record carries no identity attribute
    #[error("Source record has no identity attribute")]
    MissingIdentity,
}

/// A value could not be converted into the declared field type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    /// Integer does not fit into the declared integer width
    #[error("Value {value} is out of range for {tag} field")]
    OutOfRange { tag: FieldTag, value: i64 },

    /// NaN or infinite float cannot be narrowed to an integer
    #[error("Non-finite value {value} cannot be stored in {tag} field")]
    NonFinite { tag: FieldTag, value: f64 },
}

/// Record assembly failed as a whole
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// The same field name appears twice in the schema
    #[error("Duplicate schema field: {0}")]
    DuplicateField(String),

    /// A schema field has an empty name
    #[error("Schema field at position {0} has an empty name")]
    EmptyFieldName(usize),
}

/// Configuration loading or parsing failed
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error while reading a config or schema file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value was syntactically valid but not acceptable
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(format!("TOML error: {}", err))
    }
}

/// Result type alias for configuration and schema loading
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LookupError::NotFound("height".to_string());
        assert_eq!(err.to_string(), "Attribute not found: height");

        let err = CoercionError::OutOfRange {
            tag: FieldTag::Integer16,
            value: 70_000,
        };
        assert_eq!(err.to_string(), "Value 70000 is out of range for SHORT field");
    }

    #[test]
    fn test_config_error_from_json() {
        let err: ConfigError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error: JSON error"));
    }
}
