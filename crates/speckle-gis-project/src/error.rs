//! Error types for project settings

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    /// File access error on the project table
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored table could not be read back
    #[error("Corrupt project table: {0}")]
    Corrupt(String),

    /// The table could not be written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A URL that does not point at a Speckle stream
    #[error("Invalid stream URL '{url}': {reason}")]
    InvalidStreamUrl { url: String, reason: String },

    /// Latitude/longitude input that is not a pair of numbers
    #[error("Lat, Lon values invalid: {0}")]
    InvalidSurveyPoint(String),
}

impl From<toml::de::Error> for ProjectError {
    fn from(err: toml::de::Error) -> Self {
        ProjectError::Corrupt(err.to_string())
    }
}

impl From<toml::ser::Error> for ProjectError {
    fn from(err: toml::ser::Error) -> Self {
        ProjectError::Serialization(err.to_string())
    }
}

impl ProjectError {
    pub fn invalid_stream_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        ProjectError::InvalidStreamUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ProjectError::InvalidStreamUrl { .. } | ProjectError::InvalidSurveyPoint(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProjectError::invalid_stream_url("ftp://x", "unsupported scheme");
        assert_eq!(err.to_string(), "Invalid stream URL 'ftp://x': unsupported scheme");
        assert!(err.is_user_error());

        let err = ProjectError::Corrupt("bad".to_string());
        assert!(!err.is_user_error());
    }
}
