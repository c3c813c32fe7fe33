//! ONNX Runtime session settings.

use super::ConfigError;

/// Execution providers for ONNX Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    #[default]
    CPU,
    /// NVIDIA CUDA execution provider
    CUDA {
        /// CUDA device ID
        device_id: i32,
    },
}

/// Settings applied to both the detection and the recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Execution providers in order of preference
    pub execution_providers: Vec<OrtExecutionProvider>,
}

impl Default for OrtSessionConfig {
    fn default() -> Self {
        Self {
            intra_threads: None,
            execution_providers: vec![OrtExecutionProvider::CPU],
        }
    }
}

impl OrtSessionConfig {
    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Parses a device string such as `cpu`, `cuda` or `cuda:1`.
    ///
    /// CUDA devices keep CPU as the fallback provider.
    pub fn from_device(device: &str) -> Result<Self, ConfigError> {
        let device_lower = device.trim().to_lowercase();

        if device_lower == "cpu" {
            return Ok(Self::default());
        }

        if device_lower.starts_with("cuda") {
            let device_id = if device_lower == "cuda" {
                0
            } else if let Some(id_str) = device_lower.strip_prefix("cuda:") {
                id_str.parse::<i32>().map_err(|_| {
                    ConfigError::invalid("device", format!("invalid CUDA device ID in '{device}'"))
                })?
            } else {
                return Err(ConfigError::invalid(
                    "device",
                    format!("expected 'cuda' or 'cuda:N', got '{device}'"),
                ));
            };

            return Ok(Self {
                intra_threads: None,
                execution_providers: vec![
                    OrtExecutionProvider::CUDA { device_id },
                    OrtExecutionProvider::CPU,
                ],
            });
        }

        Err(ConfigError::invalid(
            "device",
            format!("unsupported device '{device}'"),
        ))
    }
}
