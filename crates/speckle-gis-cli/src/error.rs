//! Error types for the command-line tools

use speckle_gis_core::ConfigError;
use speckle_gis_project::ProjectError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Input file parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Schema or reconciliation settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Project settings error
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    /// Output serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        CliError::InvalidInput(msg.into())
    }

    pub fn file_error(msg: impl Into<String>) -> Self {
        CliError::FileError(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        match self {
            CliError::InvalidInput(_)
            | CliError::FileError(_)
            | CliError::ParseError(_)
            | CliError::Config(_) => true,
            CliError::Project(e) => e.is_user_error(),
            CliError::SerializationError(_) => false,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::ParseError(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::ParseError(format!("TOML error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CliError::InvalidInput("bad tag".to_string());
        assert_eq!(err.to_string(), "Invalid input: bad tag");
    }

    #[test]
    fn test_is_user_error() {
        assert!(CliError::invalid_input("x").is_user_error());
        assert!(CliError::file_error("x").is_user_error());
        assert!(!CliError::SerializationError("x".to_string()).is_user_error());
        assert!(CliError::Project(ProjectError::InvalidSurveyPoint("x".to_string())).is_user_error());
        assert!(!CliError::Project(ProjectError::Corrupt("x".to_string())).is_user_error());
    }
}
