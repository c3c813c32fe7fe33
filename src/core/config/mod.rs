//! Configuration management for the notes pipeline.
//!
//! This module provides the configuration error type, the validation trait
//! implemented by every config struct, and the ONNX Runtime session settings.

pub mod onnx;

pub use onnx::*;

use thiserror::Error;

/// Errors raised while validating or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed domain.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation hook implemented by configuration structs.
pub trait ConfigValidator {
    /// Checks every field, returning the first violation found.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Checks that `value` lies in the closed range `[min, max]`.
    fn validate_range(&self, field: &str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
        if !value.is_finite() || value < min || value > max {
            return Err(ConfigError::invalid(
                field,
                format!("must be in [{min}, {max}], got {value}"),
            ));
        }
        Ok(())
    }

    /// Checks that a count is strictly positive.
    fn validate_positive(&self, field: &str, value: usize) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::invalid(field, "must be greater than 0"));
        }
        Ok(())
    }
}
