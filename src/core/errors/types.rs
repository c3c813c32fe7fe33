//! Core error types for the notes pipeline.
//!
//! This module defines the error enum shared by every pipeline stage, plus the
//! [`ProcessingStage`] tag used to say where a processing failure happened.
//! The orchestrator converts all of these into a failure-shaped
//! [`ExtractionResult`](crate::notes::ExtractionResult); nothing below the
//! orchestrator swallows them.

use std::path::Path;
use thiserror::Error;

/// Enum representing different stages of the notes pipeline.
///
/// Used to identify which stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Tensor conversion before or after inference.
    TensorOperation,
    /// Preview image encoding.
    Encoding,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Encoding => write!(f, "encoding"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Errors raised by the notes extraction pipeline.
#[derive(Error, Debug)]
pub enum NotesError {
    /// The document could not be opened or the page could not be rendered.
    #[error("render failed for page {page}: {message}")]
    Render {
        /// Zero-based page index that was requested.
        page: usize,
        /// Description of the underlying failure.
        message: String,
    },

    /// A detection or recognition capability has not been initialized.
    #[error("{capability} capability is not initialized; load the OCR models before extracting notes")]
    ModelUnavailable {
        /// Which capability is missing ("detection" or "recognition").
        capability: &'static str,
    },

    /// An extraction exceeded its wall-clock budget.
    #[error("extraction timed out after {seconds}s")]
    Timeout {
        /// The budget that was exceeded.
        seconds: u64,
    },

    /// Error occurred while decoding or encoding an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor reshaping.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error loading a model file, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<image::ImageError> for NotesError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for NotesError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl NotesError {
    /// Creates a render error for the given page.
    pub fn render(page: usize, message: impl Into<String>) -> Self {
        Self::Render {
            page,
            message: message.into(),
        }
    }

    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error for invalid field values.
    ///
    /// # Arguments
    ///
    /// * `field` - The name of the field with an invalid value
    /// * `expected` - Description of what was expected
    /// * `actual` - Description of what was actually provided
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ConfigError {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual.into()
            ),
        }
    }

    /// Wraps an error raised inside a pipeline stage.
    pub fn processing(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wraps an inference failure for the named model.
    pub fn inference(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a model loading error with an optional suggestion.
    pub fn model_load_error(
        model_path: &Path,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<ort::Error>,
    ) -> Self {
        Self::ModelLoad {
            model_path: model_path.display().to_string(),
            reason: reason.into(),
            suggestion: suggestion
                .map(|s| format!("; {s}"))
                .unwrap_or_default(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }
}
