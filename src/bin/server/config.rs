//! Configuration types for the notes server and CLI.

use crate::engine::ServiceError;
use notes_ocr::notes::NotesConfig;
use std::path::PathBuf;
use tracing::info;

/// Model locations and pipeline settings
#[derive(Clone, Debug)]
pub struct OcrConfig {
    pub det_model: PathBuf,
    pub rec_model: PathBuf,
    pub dict_path: PathBuf,
    pub device: String,
    /// Intra-op threads per inference session
    pub threads: Option<usize>,
    /// JSON file with [`NotesConfig`] overrides
    pub notes_config: Option<PathBuf>,
}

impl OcrConfig {
    /// Loads the pipeline settings, falling back to the built-in defaults.
    pub fn load_notes_config(&self) -> Result<NotesConfig, ServiceError> {
        match &self.notes_config {
            Some(path) => {
                info!("Loading pipeline settings from {}", path.display());
                NotesConfig::from_json_file(path)
                    .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))
            }
            None => Ok(NotesConfig::default()),
        }
    }
}

/// Configuration for the HTTP server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub ocr: OcrConfig,
    pub host: String,
    pub port: u16,
    /// Wall-clock budget for one document
    pub timeout_secs: u64,
}
