use anyhow::Result;
use image::DynamicImage;

use crate::detect::result::DetectionResult;

/// Object detector backend.
///
/// A backend owns a loaded model. It is constructed once at startup and handed
/// to the [`Detector`](crate::detect::Detector); there is no reload path.
/// Inference must not carry state from one frame to the next.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run one forward pass over `image`.
    ///
    /// Box coordinates in the result are in `image` pixels.
    fn infer(&mut self, image: &DynamicImage) -> Result<DetectionResult>;

    /// Optional warm-up hook, run once before the first cycle.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
