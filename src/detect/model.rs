use std::path::PathBuf;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::yolo::YoloParams;

const DEFAULT_MODEL_PATH: &str = "yolo11s.onnx";

/// Model file and decode parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// ONNX export of a COCO-trained YOLO detector.
    pub path: PathBuf,
    pub params: YoloParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            params: YoloParams::default(),
        }
    }
}

/// Load the configured model once. The returned backend lives for the process.
#[cfg(feature = "backend-tract")]
pub fn load_backend(config: &ModelConfig) -> Result<Box<dyn DetectorBackend>> {
    let mut backend = crate::detect::backends::TractYoloBackend::load(&config.path, config.params)?;
    backend.warm_up()?;
    log::info!(
        "loaded model {} (input {}px, conf>={:.2})",
        config.path.display(),
        config.params.input_size,
        config.params.confidence_threshold
    );
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
pub fn load_backend(config: &ModelConfig) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow::anyhow!(
        "cannot load {}: model inference requires the backend-tract feature",
        config.path.display()
    ))
}
