//! Error types for the Surveyor comparison core.
//!
//! Comparisons themselves are infallible: missing or malformed document parts
//! degrade to neutral scores instead of erroring. Only configuration loading
//! and validation surface errors through these types.

/// Top-level error type for the Surveyor core library.
#[derive(Debug, thiserror::Error)]
pub enum SurveyorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from loading or validating a [`CompareConfig`](crate::config::CompareConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Similarity weights must sum to 1.0, got {sum}")]
    InvalidWeights { sum: f64 },

    #[error("Value for '{field}' must be within [0, 1], got {value}")]
    OutOfRange { field: String, value: f64 },

    #[error("Configuration load failed: {message}")]
    Load { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `SurveyorError`.
pub type Result<T> = std::result::Result<T, SurveyorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_weights() {
        let err = SurveyorError::Config(ConfigError::InvalidWeights { sum: 0.9 });
        assert_eq!(
            err.to_string(),
            "Configuration error: Similarity weights must sum to 1.0, got 0.9"
        );
    }

    #[test]
    fn test_error_display_out_of_range() {
        let err = ConfigError::OutOfRange {
            field: "matching.min_score".into(),
            value: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "Value for 'matching.min_score' must be within [0, 1], got 1.5"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SurveyorError = serde_err.into();
        assert!(matches!(err, SurveyorError::Serialization(_)));
    }

    #[test]
    fn test_error_from_config() {
        let err: SurveyorError = ConfigError::Load {
            message: "bad toml".into(),
        }
        .into();
        assert!(matches!(err, SurveyorError::Config(ConfigError::Load { .. })));
    }
}
