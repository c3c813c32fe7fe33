//! Thin wrapper around an ONNX Runtime session.
//!
//! `Session::run` needs exclusive access, so the session sits behind a mutex;
//! the wrapper itself is shared read-only between extraction calls.

mod ort_infer_config;

use crate::core::config::OrtSessionConfig;
use crate::core::errors::{NotesError, NotesResult};
use ndarray::Array4;
use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SESSION_CREATION_FAILURE: &str = "failed to create ONNX session";

/// A loaded ONNX model.
pub struct OrtInfer {
    session: Mutex<Session>,
    model_name: String,
    model_path: PathBuf,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("model_name", &self.model_name)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl OrtInfer {
    /// Loads the model at `model_path`, applying `ort_config` when provided.
    pub fn from_file(
        model_path: impl AsRef<Path>,
        model_name: impl Into<String>,
        ort_config: Option<&OrtSessionConfig>,
    ) -> NotesResult<Self> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(NotesError::model_load_error(
                path,
                "model file not found",
                Some("download the model or fix the configured path"),
                None,
            ));
        }

        let builder = Session::builder()?.with_log_level(LogLevel::Error)?;
        let builder = match ort_config {
            Some(cfg) => Self::apply_ort_config(builder, cfg)?,
            None => builder,
        };
        let session = builder.commit_from_file(path).map_err(|e| {
            NotesError::model_load_error(
                path,
                SESSION_CREATION_FAILURE,
                Some("verify model file exists and is readable"),
                Some(e),
            )
        })?;

        Ok(Self {
            session: Mutex::new(session),
            model_name: model_name.into(),
            model_path: path.to_path_buf(),
        })
    }

    /// Returns the model name used in error messages.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Returns the path the model was loaded from.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Runs the model on a single NCHW batch and returns the first output
    /// as `(shape, data)`.
    pub fn infer_4d(&self, input: &Array4<f32>) -> NotesResult<(Vec<usize>, Vec<f32>)> {
        let shape: Vec<usize> = input.shape().to_vec();
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_array((shape.clone(), data.into_boxed_slice()))?;

        let mut session = self.session.lock().map_err(|_| NotesError::InvalidInput {
            message: format!("model '{}': session lock poisoned", self.model_name),
        })?;

        let outputs = session.run(ort::inputs![tensor]).map_err(|e| {
            NotesError::inference(
                &self.model_name,
                format!("forward pass with input shape {shape:?}"),
                e,
            )
        })?;

        let (out_shape, out_data) = outputs[0].try_extract_tensor::<f32>()?;
        let out_shape = out_shape.iter().map(|&d| d.max(0) as usize).collect();

        Ok((out_shape, out_data.to_vec()))
    }
}
