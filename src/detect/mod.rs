//! Target-class detection over captured frames.
//!
//! The [`Detector`] owns an injected [`DetectorBackend`] (the loaded model),
//! the target class id and the positive-capture directory. Each call yields a
//! [`DetectOutcome`]; nothing escapes as an error.

mod annotate;
mod backend;
pub mod backends;
pub mod labels;
mod model;
mod result;
pub mod yolo;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use annotate::save_annotated;
pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractYoloBackend;
pub use labels::{class_name, CAT_CLASS_ID};
pub use model::{load_backend, ModelConfig};
pub use result::{BoundingBox, DetectOutcome, Detection, DetectionResult};
pub use yolo::YoloParams;

use crate::cycle::CycleTimestamp;

pub struct Detector {
    backend: Box<dyn DetectorBackend>,
    target_class: u32,
    positive_dir: PathBuf,
}

impl Detector {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        target_class: u32,
        positive_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            target_class,
            positive_dir: positive_dir.into(),
        }
    }

    pub fn target_class(&self) -> u32 {
        self.target_class
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run the model on `image_path`.
    ///
    /// On a hit the annotated frame is written to `<positive_dir>/<ts>.jpg`.
    pub fn detect(&mut self, image_path: &Path, ts: &CycleTimestamp) -> DetectOutcome {
        let label = class_name(self.target_class);
        match self.try_detect(image_path, ts) {
            Ok(Some(path)) => {
                log::info!("{} detected, saved {}", label, path.display());
                DetectOutcome::Detected(path)
            }
            Ok(None) => {
                log::info!("no {} in {}", label, image_path.display());
                DetectOutcome::NotDetected
            }
            Err(e) => {
                log::error!("detection failed for {}: {:#}", image_path.display(), e);
                DetectOutcome::Failed(e)
            }
        }
    }

    fn try_detect(&mut self, image_path: &Path, ts: &CycleTimestamp) -> Result<Option<PathBuf>> {
        let image = image::open(image_path)
            .with_context(|| format!("failed to open image {}", image_path.display()))?;
        let result = self
            .backend
            .infer(&image)
            .with_context(|| format!("{} inference failed", self.backend.name()))?;
        log::debug!("detected classes {:?}", result.class_ids());

        if !result.contains_class(self.target_class) {
            return Ok(None);
        }
        let output = self.positive_dir.join(ts.file_name());
        save_annotated(&image, &result.detections, self.target_class, &output)?;
        Ok(Some(output))
    }
}
