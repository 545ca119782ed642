use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::DynamicImage;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, DetectionResult};

/// Stub backend for testing and dry runs.
///
/// Reports the same class ids for every frame (boxes centred on the image), or
/// fails every call when built with [`StubBackend::failing`].
pub struct StubBackend {
    classes: Vec<u32>,
    failure: Option<String>,
    calls: Arc<AtomicU64>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::with_classes([])
    }

    pub fn with_classes(classes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            classes: classes.into_iter().collect(),
            failure: None,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new()
        }
    }

    /// Shared counter of `infer` calls, readable after the backend is boxed.
    pub fn call_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.calls)
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, image: &DynamicImage) -> Result<DetectionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(anyhow!("{}", reason));
        }

        let (w, h) = (image.width() as f32, image.height() as f32);
        let detections = self
            .classes
            .iter()
            .map(|&class_id| Detection {
                class_id,
                confidence: 0.9,
                bbox: BoundingBox::from_center(w / 2.0, h / 2.0, w / 2.0, h / 2.0),
            })
            .collect();
        Ok(DetectionResult::new(detections))
    }
}
