//! Nested attribute flattening
//!
//! GIS fields are flat, Speckle attributes are not. A composite attribute is
//! expanded into `root_suffix` keyed scalars: list items by index, object
//! members by name, recursively.
//!
//! ```text
//! Elevation = [12.5, {"min": 3}]   =>   Elevation_0   = 12.5
//!                                       Elevation_1_min = 3
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use crate::field::{classify, FieldTag};
use crate::value::AttributeValue;

/// A branch that was left out of the flattened output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBranch {
    pub path: String,
    pub reason: String,
}

/// Scalar leaves of a composite attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Flattened {
    /// Classified tag of every leaf
    pub tags: BTreeMap<String, FieldTag>,
    /// Value of every leaf
    pub values: BTreeMap<String, AttributeValue>,
    /// Branches omitted, with the reason
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedBranch>,
}

impl Flattened {
    pub fn get(&self, key: &str) -> Option<(&AttributeValue, FieldTag)> {
        let value = self.values.get(key)?;
        let tag = self.tags.get(key).copied().unwrap_or_else(|| classify(value));
        Some((value, tag))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, path: String, value: &AttributeValue) {
        self.tags.insert(path.clone(), classify(value));
        self.values.insert(path, value.clone());
    }
}

/// Flattens composite attributes up to a nesting limit
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    max_depth: usize,
}

impl Default for Flattener {
    fn default() -> Self {
        Self { max_depth: 32 }
    }
}

impl Flattener {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Flatten `value` under `root`. A scalar yields a single `root` entry.
    pub fn flatten(&self, root: &str, value: &AttributeValue) -> Flattened {
        let mut out = Flattened::default();
        self.walk(root.to_string(), value, 0, &mut out);
        out
    }

    fn walk(&self, path: String, value: &AttributeValue, depth: usize, out: &mut Flattened) {
        if value.is_composite() && depth >= self.max_depth {
            tracing::debug!(path = %path, depth, "Nested attribute exceeds flatten depth");
            out.skipped.push(SkippedBranch {
                reason: format!("nesting deeper than {} levels", self.max_depth),
                path,
            });
            return;
        }

        match value {
            AttributeValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(format!("{}_{}", path, i), item, depth + 1, out);
                }
            }
            AttributeValue::Object(members) => {
                for (name, member) in members {
                    self.walk(format!("{}_{}", path, name), member, depth + 1, out);
                }
            }
            scalar => out.insert(path, scalar),
        }
    }
}

/// Flatten with the default depth limit
pub fn flatten(root: &str, value: &AttributeValue) -> Flattened {
    Flattener::default().flatten(root, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_is_terminal() {
        let out = flatten("height", &AttributeValue::Float(3.5));
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("height"), Some((&AttributeValue::Float(3.5), FieldTag::Float)));
    }

    #[test]
    fn test_list_and_object_paths() {
        let value = AttributeValue::from(&json!([12.5, {"min": 3, "label": "low"}]));
        let out = flatten("Elevation", &value);

        assert_eq!(out.values["Elevation_0"], AttributeValue::Float(12.5));
        assert_eq!(out.values["Elevation_1_min"], AttributeValue::Integer(3));
        assert_eq!(out.tags["Elevation_1_label"], FieldTag::Text);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_empty_composites_produce_nothing() {
        assert!(flatten("x", &AttributeValue::from(&json!([]))).is_empty());
        assert!(flatten("x", &AttributeValue::from(&json!({}))).is_empty());
    }

    #[test]
    fn test_last_writer_wins_on_collision() {
        // "x" is visited before "x_y", so the direct member wins
        let colliding = AttributeValue::from(&json!({"x": {"y": 1}, "x_y": 2}));
        let out = flatten("r", &colliding);
        assert_eq!(out.values["r_x_y"], AttributeValue::Integer(2));
    }

    #[test]
    fn test_depth_limit_skips_only_deep_branch() {
        let value = AttributeValue::from(&json!({"shallow": 1, "deep": [[[[1]]]]}));
        let out = Flattener::new(3).flatten("r", &value);

        assert_eq!(out.values["r_shallow"], AttributeValue::Integer(1));
        assert_eq!(out.len(), 1);
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].path, "r_deep_0_0");
    }
}
