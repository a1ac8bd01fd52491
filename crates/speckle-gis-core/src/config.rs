//! Reconciliation settings
//!
//! Defaults match what ArcGIS feature classes accept. Settings can be loaded
//! from a JSON, YAML or TOML file and overridden by `SPECKLE_GIS__*`
//! environment variables, e.g. `SPECKLE_GIS__TEXT_MAX_CHARS=128`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SPECKLE_GIS";

/// Longest string an Esri TEXT field stores by default
pub const DEFAULT_TEXT_MAX_CHARS: usize = 255;

/// Field that receives the Speckle object id
pub const DEFAULT_IDENTITY_FIELD: &str = "Speckle_ID";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Text values longer than this many characters are truncated
    pub text_max_chars: usize,
    /// Nesting below this depth is not flattened
    pub max_flatten_depth: usize,
    /// Schema field filled from the source record's identity
    pub identity_field: String,
    /// Strings the host uses to mean "no value"
    pub null_sentinels: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            text_max_chars: DEFAULT_TEXT_MAX_CHARS,
            max_flatten_depth: 32,
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            null_sentinels: vec!["NULL".to_string(), "None".to_string()],
        }
    }
}

impl ReconcileConfig {
    /// Load settings from a file; missing keys fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_vars(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs named `SPECKLE_GIS__<FIELD>`
    pub fn with_env_vars<I>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = format!("{}__", ENV_PREFIX);
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(&prefix) else {
                continue;
            };
            match key {
                "TEXT_MAX_CHARS" => self.text_max_chars = parse_usize(key, &value)?,
                "MAX_FLATTEN_DEPTH" => self.max_flatten_depth = parse_usize(key, &value)?,
                "IDENTITY_FIELD" => self.identity_field = value,
                "NULL_SENTINELS" => {
                    self.null_sentinels = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                other => {
                    tracing::debug!(key = other, "Ignoring unknown environment override");
                }
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.text_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "text_max_chars".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.identity_field.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "identity_field".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_ascii_lowercase(),
        message: format!("{}", e),
    })
}
