//! Extraction engine shared between CLI and server modes.

use crate::config::OcrConfig;
use notes_ocr::core::config::OrtSessionConfig;
use notes_ocr::domain::OcrModels;
use notes_ocr::notes::{ExtractOptions, ExtractionResult, NotesExtractor};
use notes_ocr::prelude::NotesError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Notes(#[from] NotesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Extraction result plus upload bookkeeping.
#[derive(Debug, Serialize)]
pub struct NotesResponse {
    #[serde(flatten)]
    pub result: ExtractionResult,
    pub filename: String,
    pub file_size: usize,
    /// Seconds spent in the handler for this document
    pub processing_time: f64,
}

/// Response for a multi-document request.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total: usize,
    pub succeeded: usize,
    pub results: Vec<NotesResponse>,
    pub processing_time: f64,
}

impl BatchResponse {
    pub fn new(results: Vec<NotesResponse>, processing_time: f64) -> Self {
        let succeeded = results.iter().filter(|r| r.result.success).count();
        Self {
            success: succeeded == results.len(),
            total: results.len(),
            succeeded,
            results,
            processing_time,
        }
    }
}

/// Runs one extraction on a stored document.
pub trait NotesProcessor: Send + Sync {
    /// Failures are reported inside the result.
    fn process(&self, path: &Path, options: &ExtractOptions) -> ExtractionResult;
}

/// Loaded models wrapped in a ready extractor.
pub struct NotesEngine {
    extractor: NotesExtractor,
}

impl NotesEngine {
    /// Loads both models and the pipeline settings.
    pub fn new(config: &OcrConfig) -> Result<Self, ServiceError> {
        for (label, path) in [
            ("Detection model", &config.det_model),
            ("Recognition model", &config.rec_model),
            ("Dictionary", &config.dict_path),
        ] {
            if !path.exists() {
                return Err(ServiceError::ModelNotFound(format!(
                    "{label}: {}",
                    path.display()
                )));
            }
        }

        let notes_config = config.load_notes_config()?;
        let mut ort_config = OrtSessionConfig::from_device(&config.device)
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        if let Some(threads) = config.threads {
            ort_config = ort_config.with_intra_threads(threads);
        }
        info!(
            device = %config.device,
            threads = ?config.threads,
            "Configuring inference sessions"
        );

        let models = OcrModels::from_paths(
            &config.det_model,
            &config.rec_model,
            &config.dict_path,
            notes_config.detection.clone(),
            Some(ort_config),
        )?;
        let extractor = NotesExtractor::with_pdfium(models, notes_config)?;

        Ok(Self { extractor })
    }
}

impl NotesProcessor for NotesEngine {
    fn process(&self, path: &Path, options: &ExtractOptions) -> ExtractionResult {
        self.extractor.extract(path, options)
    }
}

type Loader = Arc<dyn Fn() -> Result<Arc<dyn NotesProcessor>, ServiceError> + Send + Sync>;

/// Lazily initialized engine.
///
/// A failed load leaves the slot empty so the next request retries it.
pub struct EngineSlot {
    device: String,
    loader: Loader,
    engine: OnceCell<Arc<dyn NotesProcessor>>,
}

impl EngineSlot {
    /// Slot that loads a [`NotesEngine`] from `config`.
    pub fn new(config: OcrConfig) -> Self {
        let device = config.device.clone();
        Self::with_loader(device, move || {
            NotesEngine::new(&config).map(|engine| Arc::new(engine) as Arc<dyn NotesProcessor>)
        })
    }

    /// Slot backed by an arbitrary loader, run on the blocking pool.
    pub fn with_loader<F>(device: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn NotesProcessor>, ServiceError> + Send + Sync + 'static,
    {
        Self {
            device: device.into(),
            loader: Arc::new(loader),
            engine: OnceCell::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// Returns the engine, loading the models on first use.
    pub async fn get(&self) -> Result<Arc<dyn NotesProcessor>, ServiceError> {
        self.engine
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let engine = tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| ServiceError::Internal(format!("model loading task failed: {e}")))?
                    .inspect_err(|e| warn!("Model loading failed: {e}"))?;
                info!("Models loaded");
                Ok::<_, ServiceError>(engine)
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed;

    impl NotesProcessor for Fixed {
        fn process(&self, _path: &Path, _options: &ExtractOptions) -> ExtractionResult {
            ExtractionResult::failure("unused")
        }
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let slot = EngineSlot::with_loader("cpu", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ServiceError::ModelNotFound("det.onnx".to_string()))
            } else {
                Ok(Arc::new(Fixed) as Arc<dyn NotesProcessor>)
            }
        });

        assert!(matches!(slot.get().await, Err(ServiceError::ModelNotFound(_))));
        assert!(!slot.is_loaded());

        assert!(slot.get().await.is_ok());
        assert!(slot.is_loaded());
        assert!(slot.get().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_model_files_are_reported() {
        let config = OcrConfig {
            det_model: "/nonexistent/det.onnx".into(),
            rec_model: "/nonexistent/rec.onnx".into(),
            dict_path: "/nonexistent/dict.txt".into(),
            device: "cpu".to_string(),
            threads: None,
            notes_config: None,
        };
        assert!(matches!(
            NotesEngine::new(&config),
            Err(ServiceError::ModelNotFound(msg)) if msg.contains("det.onnx")
        ));
    }

    #[test]
    fn test_batch_response_counts() {
        let item = |success: bool| NotesResponse {
            result: if success {
                ExtractionResult::success(
                    "1. Material: Steel".to_string(),
                    [0, 0, 1, 1],
                    notes_ocr::notes::Orientation::Landscape,
                    None,
                )
            } else {
                ExtractionResult::failure("bad")
            },
            filename: "a.pdf".to_string(),
            file_size: 1,
            processing_time: 0.0,
        };
        let batch = BatchResponse::new(vec![item(true), item(false)], 0.1);
        assert!(!batch.success);
        assert_eq!((batch.total, batch.succeeded), (2, 1));
    }
}
