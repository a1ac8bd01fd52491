//! Field coercion: fitting a dynamic value into a declared field type
//!
//! Coercion is lossy-safe. A value that cannot be represented under the
//! declared tag becomes null instead of failing the record; the rule that
//! fired is returned so callers can tell the cases apart.

use serde::Serialize;

use crate::config::ReconcileConfig;
use crate::error::CoercionError;
use crate::field::{classify, FieldTag, FieldValue, OutputRecord};
use crate::log::{LogLevel, LogSink};
use crate::value::AttributeValue;

const ORIGIN: &str = "coerce_field";

/// Which coercion rule produced a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CoercionRule {
    /// Value already had the declared type
    Exact,
    /// Text was cut down to the configured maximum
    Truncated { original_chars: usize },
    /// Float stored in an integer field, truncated toward zero
    Narrowed,
    /// Integer stored in a float field
    Widened,
    /// Source value was null
    Null,
    /// No conversion exists; stored as null
    Mismatch { found: FieldTag },
}

/// Result of a successful coercion
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub value: Option<FieldValue>,
    pub rule: CoercionRule,
}

impl Coerced {
    fn stored(value: FieldValue, rule: CoercionRule) -> Self {
        Self {
            value: Some(value),
            rule,
        }
    }

    fn null(rule: CoercionRule) -> Self {
        Self { value: None, rule }
    }
}

/// Coerce `value` into a field declared as `tag`.
///
/// Text longer than `text_max_chars` characters is truncated. Errors are
/// reserved for values that match a conversion rule but cannot be
/// represented: integers outside the field's width and non-finite floats
/// headed for an integer field.
pub fn coerce(
    tag: FieldTag,
    value: &AttributeValue,
    text_max_chars: usize,
) -> Result<Coerced, CoercionError> {
    if value.is_null() {
        return Ok(Coerced::null(CoercionRule::Null));
    }

    if tag == FieldTag::Text {
        let text = value.to_text();
        let chars = text.chars().count();
        if chars > text_max_chars {
            let truncated: String = text.chars().take(text_max_chars).collect();
            return Ok(Coerced::stored(
                FieldValue::Text(truncated),
                CoercionRule::Truncated {
                    original_chars: chars,
                },
            ));
        }
        return Ok(Coerced::stored(FieldValue::Text(text), CoercionRule::Exact));
    }

    let found = classify(value);
    match (tag, value) {
        (FieldTag::Integer32, AttributeValue::Integer(i)) => i32::try_from(*i)
            .map(|v| Coerced::stored(FieldValue::Integer32(v), CoercionRule::Exact))
            .map_err(|_| CoercionError::OutOfRange { tag, value: *i }),
        (FieldTag::Integer16, AttributeValue::Boolean(b)) => Ok(Coerced::stored(
            FieldValue::Integer16(i16::from(*b)),
            CoercionRule::Exact,
        )),
        (FieldTag::Float, AttributeValue::Float(f)) => {
            Ok(Coerced::stored(FieldValue::Float(*f), CoercionRule::Exact))
        }
        (FieldTag::Integer32, AttributeValue::Float(f)) => {
            narrow(*f).map(|v| Coerced::stored(FieldValue::Integer32(v), CoercionRule::Narrowed))
        }
        (FieldTag::Float, AttributeValue::Integer(i)) => Ok(Coerced::stored(
            FieldValue::Float(*i as f64),
            CoercionRule::Widened,
        )),
        _ => Ok(Coerced::null(CoercionRule::Mismatch { found })),
    }
}

fn narrow(value: f64) -> Result<i32, CoercionError> {
    if !value.is_finite() {
        return Err(CoercionError::NonFinite {
            tag: FieldTag::Integer32,
            value,
        });
    }
    let truncated = value.trunc();
    if truncated < i32::MIN as f64 || truncated > i32::MAX as f64 {
        return Err(CoercionError::OutOfRange {
            tag: FieldTag::Integer32,
            value: truncated as i64,
        });
    }
    Ok(truncated as i32)
}

/// Applies [`coerce`] to an output record, reporting to the user log
pub struct FieldCoercer<'a> {
    config: &'a ReconcileConfig,
    sink: &'a dyn LogSink,
}

impl<'a> FieldCoercer<'a> {
    pub fn new(config: &'a ReconcileConfig, sink: &'a dyn LogSink) -> Self {
        Self { config, sink }
    }

    fn is_sentinel(&self, value: &AttributeValue) -> bool {
        match value {
            AttributeValue::Text(s) => self.config.null_sentinels.iter().any(|n| n == s),
            _ => false,
        }
    }

    /// Coerce `value` and store it under `name` in `record`.
    ///
    /// Text equal to one of the configured null sentinels is stored as null.
    /// Returns the rule that fired, or `None` if coercion failed; a failed
    /// field is logged as a warning and `record` is left as it was.
    pub fn coerce_into(
        &self,
        record: &mut OutputRecord,
        name: &str,
        tag: FieldTag,
        value: &AttributeValue,
    ) -> Option<CoercionRule> {
        let null = AttributeValue::Null;
        let value = if self.is_sentinel(value) { &null } else { value };
        match coerce(tag, value, self.config.text_max_chars) {
            Ok(coerced) => {
                if let CoercionRule::Truncated { original_chars } = coerced.rule {
                    tracing::debug!(field = name, original_chars, "Truncated text value");
                    self.sink.log(
                        &format!(
                            "Field \"{}\" values are trimmed at {} characters",
                            name, self.config.text_max_chars
                        ),
                        LogLevel::Warning,
                        ORIGIN,
                    );
                }
                record.insert(name.to_string(), coerced.value);
                Some(coerced.rule)
            }
            Err(e) => {
                self.sink
                    .log(&format!("Field \"{}\": {}", name, e), LogLevel::Warning, ORIGIN);
                None
            }
        }
    }
}
