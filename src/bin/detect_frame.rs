//! detect_frame - run the detection model on one image file.
//!
//! Useful for checking a model export or a threshold without a camera or a
//! webhook. Prints one line per detection; exits non-zero if the model or the
//! image cannot be loaded.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cat_sentry::detect::{
    self, class_name, DetectorBackend, ModelConfig, YoloParams, CAT_CLASS_ID,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the detector on a single image")]
struct Args {
    /// Image to analyze.
    image: PathBuf,

    /// ONNX model path.
    #[arg(long, env = "CAT_SENTRY_MODEL_PATH", default_value = "yolo11s.onnx")]
    model: PathBuf,

    /// Square model input size in pixels.
    #[arg(long, default_value_t = 640)]
    input_size: u32,

    /// Minimum class score.
    #[arg(long, default_value_t = 0.25)]
    confidence: f32,

    /// Class id reported as the target.
    #[arg(long, env = "CAT_SENTRY_TARGET_CLASS", default_value_t = CAT_CLASS_ID)]
    target_class: u32,

    /// Write an annotated copy here.
    #[arg(long)]
    annotate: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let model_cfg = ModelConfig {
        path: args.model.clone(),
        params: YoloParams {
            input_size: args.input_size,
            confidence_threshold: args.confidence,
            ..YoloParams::default()
        },
    };
    let mut backend = detect::load_backend(&model_cfg)?;

    let image = image::open(&args.image)
        .with_context(|| format!("failed to open image {}", args.image.display()))?;
    let result = backend.infer(&image)?;

    for det in &result.detections {
        println!(
            "{:>3} {:<14} {:.2}  x={:.0} y={:.0} w={:.0} h={:.0}",
            det.class_id,
            class_name(det.class_id),
            det.confidence,
            det.bbox.x,
            det.bbox.y,
            det.bbox.w,
            det.bbox.h
        );
    }
    let hit = result.contains_class(args.target_class);
    println!(
        "{}: {}",
        class_name(args.target_class),
        if hit { "present" } else { "absent" }
    );

    if let Some(out) = &args.annotate {
        detect::save_annotated(&image, &result.detections, args.target_class, out)?;
        println!("annotated image written to {}", out.display());
    }
    Ok(())
}
