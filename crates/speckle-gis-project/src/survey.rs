//! Survey point and the custom project CRS derived from it
//!
//! Received geometry is placed relative to a survey point. The project's map
//! then uses a transverse Mercator projection centred on that point.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ProjectError, Result};

/// Prefix used by older plugin versions when saving the point
const LEGACY_PREFIX: &str = "speckle_sr_origin_";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyPoint {
    pub lat: f64,
    pub lon: f64,
}

impl SurveyPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ProjectError::InvalidSurveyPoint(format!(
                "{};{} is not a finite coordinate",
                lat, lon
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Parse text typed by the user, ignoring spaces
    pub fn from_inputs(lat: &str, lon: &str) -> Result<Self> {
        let parse = |s: &str| {
            s.replace(' ', "")
                .parse::<f64>()
                .map_err(|e| ProjectError::InvalidSurveyPoint(format!("'{}': {}", s, e)))
        };
        Self::new(parse(lat)?, parse(lon)?)
    }

    /// Parse the stored `"lat;lon"` form. Extra `;` parts are ignored.
    pub fn parse_stored(stored: &str) -> Result<Self> {
        let compact = stored.replace(' ', "");
        let compact = compact.strip_prefix(LEGACY_PREFIX).unwrap_or(&compact);
        let mut parts = compact.split(';');
        match (parts.next(), parts.next()) {
            (Some(lat), Some(lon)) => Self::from_inputs(lat, lon),
            _ => Err(ProjectError::InvalidSurveyPoint(format!(
                "expected 'lat;lon', got '{}'",
                stored
            ))),
        }
    }

    /// The stored `"lat;lon"` form
    pub fn to_stored(&self) -> String {
        format!("{};{}", self.lat, self.lon)
    }

    /// PROJ definition of the transverse Mercator CRS centred on this point
    pub fn custom_crs(&self) -> String {
        format!(
            "+proj=tmerc +ellps=WGS84 +datum=WGS84 +units=m +no_defs +lon_0={} +lat_0={} +x_0=0 +y_0=0 +k_0=1",
            self.lon, self.lat
        )
    }
}

impl fmt::Display for SurveyPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lat {}, lon {}", self.lat, self.lon)
    }
}
