#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::DetectionResult;
use crate::detect::yolo::{self, Letterbox, YoloParams};

type YoloPlan = TypedRunnableModel<TypedModel>;

/// Tract-based backend for YOLO ONNX exports.
///
/// Loads a local model file once and runs it on RGB frames letterboxed into
/// the square model input. No network I/O; nothing written to disk.
pub struct TractYoloBackend {
    model: YoloPlan,
    params: YoloParams,
}

impl TractYoloBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P, params: YoloParams) -> Result<Self> {
        let model_path = model_path.as_ref();
        let size = params.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, params })
    }

    fn build_input(&self, image: &DynamicImage) -> (Tensor, Letterbox) {
        let (canvas, letterbox) = yolo::letterbox_image(image, self.params.input_size);
        let size = self.params.input_size as usize;
        let tensor = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            canvas.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        })
        .into_tensor();
        (tensor, letterbox)
    }
}

impl DetectorBackend for TractYoloBackend {
    fn name(&self) -> &'static str {
        "tract-yolo"
    }

    fn infer(&mut self, image: &DynamicImage) -> Result<DetectionResult> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!("frame has zero dimensions"));
        }
        let (input, letterbox) = self.build_input(image);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        let data: Vec<f32> = view.iter().copied().collect();

        let detections = yolo::decode(&data, &shape, &letterbox, &self.params)?;
        Ok(DetectionResult::new(detections))
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.params.input_size;
        let blank = DynamicImage::ImageRgb8(image::RgbImage::new(size, size));
        self.infer(&blank).map(|_| ())
    }
}
