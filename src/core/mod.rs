//! The core module of the notes pipeline.
//!
//! This module contains the fundamental building blocks shared by every stage:
//! - Configuration management and validation
//! - Error handling
//! - ONNX Runtime inference integration

pub mod config;
pub mod errors;
pub mod inference;

pub use config::{ConfigError, ConfigValidator, OrtExecutionProvider, OrtSessionConfig};
pub use errors::{NotesError, NotesResult, ProcessingStage};
pub use inference::OrtInfer;
