//! Polygon extrusion heights from saved layer transforms
//!
//! Users attach transforms to layers in the plugin panel. They are saved as
//! display strings of the form
//!
//! ```text
//! Buildings ('height')  ->  Extrude polygons by attribute
//! Parcels  ->  Extrude polygons (ignore features without height)
//! ```
//!
//! An extrusion transform reads the feature's height from the selected
//! attribute. Features without a usable height either get no extrusion (when
//! the transform says "ignore") or a plausible random height.

use rand::Rng;
use std::str::FromStr;

use crate::assemble::SourceRecord;
use crate::log::{LogLevel, LogSink};
use crate::value::AttributeValue;

const ORIGIN: &str = "polygon_feature_height";
const ARROW: &str = "  ->  ";

/// Fewer known heights than this and the fallback ignores them
const MIN_SAMPLES_FOR_ESTIMATE: usize = 5;

/// A transform the user attached to a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTransform {
    pub layer_name: String,
    pub attribute: Option<String>,
    /// Lower-cased transform name
    pub name: String,
}

impl SavedTransform {
    pub fn ignores_missing(&self) -> bool {
        self.name.contains("ignore")
    }

    pub fn is_polygon_extrusion(&self) -> bool {
        self.name.contains("extrude") && self.name.contains("polygon")
    }
}

impl FromStr for SavedTransform {
    type Err = String;

    fn from_str(item: &str) -> Result<Self, Self::Err> {
        let (layer_part, transform) = item
            .split_once(ARROW)
            .ok_or_else(|| format!("Transform entry without '->': {}", item))?;

        let (layer_name, attribute) = match layer_part.split_once(" ('") {
            Some((layer, rest)) => {
                let attribute = rest.split_once("')").map_or(rest, |(attr, _)| attr);
                (layer, Some(attribute.to_string()))
            }
            None => (layer_part, None),
        };

        Ok(Self {
            layer_name: layer_name.to_string(),
            attribute,
            name: transform.trim().to_lowercase(),
        })
    }
}

/// What the resolver needs to know about the layer being converted
#[derive(Debug, Clone, Copy)]
pub struct LayerContext<'a> {
    pub layer_name: &'a str,
    /// Extrusion is meaningless in degrees, so geographic CRSs never extrude
    pub is_geographic: bool,
    /// The height attribute's value on every feature of the layer
    pub existing_values: &'a [AttributeValue],
}

/// Resolves polygon extrusion heights for features of a layer
pub struct HeightResolver<'a> {
    transforms: Vec<SavedTransform>,
    sink: &'a dyn LogSink,
}

impl<'a> HeightResolver<'a> {
    pub fn new(transforms: Vec<SavedTransform>, sink: &'a dyn LogSink) -> Self {
        Self { transforms, sink }
    }

    /// Parse saved transform strings, logging and dropping malformed ones
    pub fn from_saved<I, S>(items: I, sink: &'a dyn LogSink) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let transforms = items
            .into_iter()
            .filter_map(|item| match item.as_ref().parse::<SavedTransform>() {
                Ok(t) => Some(t),
                Err(e) => {
                    sink.log(&e, LogLevel::Warning, ORIGIN);
                    None
                }
            })
            .collect();
        Self::new(transforms, sink)
    }

    pub fn transforms(&self) -> &[SavedTransform] {
        &self.transforms
    }

    /// Extrusion height for `feature`, or `None` when it should stay flat
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        layer: &LayerContext<'_>,
        feature: &dyn SourceRecord,
        rng: &mut R,
    ) -> Option<f64> {
        let transform = self
            .transforms
            .iter()
            .find(|t| t.layer_name == layer.layer_name)?;
        let ignore = transform.ignores_missing();

        let Some(attribute) = transform.attribute.as_deref() else {
            if !ignore {
                self.sink
                    .log("Attribute for extrusion not selected", LogLevel::Warning, ORIGIN);
            }
            return None;
        };

        if !transform.is_polygon_extrusion() || layer.is_geographic {
            return None;
        }

        if let Some(height) = feature.get(attribute).ok().as_ref().and_then(numeric) {
            return Some(height);
        }
        if ignore {
            return None;
        }
        Some(estimate_height(layer.existing_values, rng))
    }
}

fn numeric(value: &AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Integer(i) => Some(*i as f64),
        AttributeValue::Float(f) if f.is_finite() => Some(*f),
        AttributeValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Random whole-number height near the layer's median, or 10..=20 without enough samples
fn estimate_height<R: Rng + ?Sized>(existing: &[AttributeValue], rng: &mut R) -> f64 {
    let mut known: Vec<f64> = existing
        .iter()
        .filter_map(|v| match v {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        })
        .collect();

    if known.len() > MIN_SAMPLES_FOR_ESTIMATE {
        known.sort_by(f64::total_cmp);
        let median = known[known.len() / 2].round() as i64;
        rng.gen_range(median.saturating_sub(5)..=median.saturating_add(5)) as f64
    } else {
        rng.gen_range(10..=20) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemorySink;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn feature(height: Option<AttributeValue>) -> BTreeMap<String, AttributeValue> {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), AttributeValue::from("f1"));
        if let Some(h) = height {
            map.insert("height".to_string(), h);
        }
        map
    }

    fn layer<'a>(existing: &'a [AttributeValue]) -> LayerContext<'a> {
        LayerContext {
            layer_name: "Buildings",
            is_geographic: false,
            existing_values: existing,
        }
    }

    #[test]
    fn test_parse_saved_transform() {
        let t: SavedTransform = "Buildings ('height')  ->  Extrude polygons by attribute"
            .parse()
            .unwrap();
        assert_eq!(t.layer_name, "Buildings");
        assert_eq!(t.attribute.as_deref(), Some("height"));
        assert!(t.is_polygon_extrusion());
        assert!(!t.ignores_missing());

        let t: SavedTransform = "Parcels  ->  Extrude polygons, ignore missing".parse().unwrap();
        assert_eq!(t.layer_name, "Parcels");
        assert_eq!(t.attribute, None);
        assert!(t.ignores_missing());

        assert!("no arrow here".parse::<SavedTransform>().is_err());
    }

    #[test]
    fn test_height_read_from_attribute() {
        let sink = MemorySink::new();
        let resolver = HeightResolver::from_saved(["Buildings ('height')  ->  extrude polygon"], &sink);
        let mut rng = StdRng::seed_from_u64(7);

        let height = resolver.resolve(&layer(&[]), &feature(Some(AttributeValue::Float(12.5))), &mut rng);
        assert_eq!(height, Some(12.5));

        let text = resolver.resolve(&layer(&[]), &feature(Some(AttributeValue::from("8"))), &mut rng);
        assert_eq!(text, Some(8.0));
    }

    #[test]
    fn test_other_layers_and_geographic_not_extruded() {
        let sink = MemorySink::new();
        let resolver = HeightResolver::from_saved(["Roads ('h')  ->  extrude polygon"], &sink);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(resolver.resolve(&layer(&[]), &feature(None), &mut rng), None);

        let resolver = HeightResolver::from_saved(["Buildings ('height')  ->  extrude polygon"], &sink);
        let geographic = LayerContext {
            is_geographic: true,
            ..layer(&[])
        };
        let value = feature(Some(AttributeValue::Float(3.0)));
        assert_eq!(resolver.resolve(&geographic, &value, &mut rng), None);
    }

    #[test]
    fn test_missing_attribute_selection_warns() {
        let sink = MemorySink::new();
        let resolver = HeightResolver::from_saved(["Buildings  ->  extrude polygon"], &sink);
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(resolver.resolve(&layer(&[]), &feature(None), &mut rng), None);
        assert_eq!(sink.at_least(LogLevel::Warning).len(), 1);
    }

    #[test]
    fn test_missing_height_ignored_or_estimated() {
        let sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(7);

        let ignoring =
            HeightResolver::from_saved(["Buildings ('height')  ->  extrude polygon (ignore)"], &sink);
        assert_eq!(ignoring.resolve(&layer(&[]), &feature(None), &mut rng), None);

        let estimating = HeightResolver::from_saved(["Buildings ('height')  ->  extrude polygon"], &sink);
        let guess = estimating
            .resolve(&layer(&[]), &feature(Some(AttributeValue::Null)), &mut rng)
            .unwrap();
        assert!((10.0..=20.0).contains(&guess));

        let samples: Vec<AttributeValue> = [30, 31, 32, 33, 34, 35, 36]
            .iter()
            .map(|h| AttributeValue::Integer(*h))
            .collect();
        let near_median = estimating
            .resolve(&layer(&samples), &feature(None), &mut rng)
            .unwrap();
        assert!((28.0..=38.0).contains(&near_median));
    }

    #[test]
    fn test_estimate_near_huge_median() {
        let sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(7);
        let resolver = HeightResolver::from_saved(["Buildings ('height')  ->  extrude polygon"], &sink);

        let huge = vec![AttributeValue::Float(1e300); 6];
        let height = resolver.resolve(&layer(&huge), &feature(None), &mut rng).unwrap();
        assert!(height >= (i64::MAX - 5) as f64);

        let tiny = vec![AttributeValue::Float(-1e300); 6];
        let height = resolver.resolve(&layer(&tiny), &feature(None), &mut rng).unwrap();
        assert!(height <= (i64::MIN + 5) as f64);
    }
}
