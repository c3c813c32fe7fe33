use super::*;
use crate::core::config::OrtExecutionProvider;
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::session::builder::SessionBuilder;

impl OrtInfer {
    pub(super) fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        if let Some(threads) = cfg.intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        let providers = cfg
            .execution_providers
            .iter()
            .map(Self::execution_provider)
            .collect::<Result<Vec<_>, _>>()?;
        builder.with_execution_providers(providers)
    }

    fn execution_provider(provider: &OrtExecutionProvider) -> Result<ExecutionProviderDispatch, ort::Error> {
        match *provider {
            OrtExecutionProvider::CPU => Ok(CPUExecutionProvider::default().build()),
            #[cfg(feature = "cuda")]
            OrtExecutionProvider::CUDA { device_id } => Ok(
                ort::execution_providers::CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ),
            #[cfg(not(feature = "cuda"))]
            OrtExecutionProvider::CUDA { device_id } => Err(ort::Error::new(format!(
                "CUDA device {device_id} requested but the cuda feature is not enabled"
            ))),
        }
    }
}
