//! YOLO head decoding.
//!
//! Ultralytics detection exports (v8, 11) emit one tensor shaped
//! `[1, 4 + classes, anchors]`: per anchor a center/size box in model-input
//! pixels followed by one score per class, with no objectness term. Some
//! exports are transposed to `[1, anchors, 4 + classes]`; both are accepted.
//!
//! Frames are letterboxed into the square input (aspect kept, gray padding),
//! and decoded boxes are mapped back through the same [`Letterbox`].

use std::cmp::Ordering;

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

use crate::detect::result::{BoundingBox, Detection};

const BOX_ATTRS: usize = 4;
/// Padding gray used by Ultralytics preprocessing.
const LETTERBOX_FILL: Rgb<u8> = Rgb([114, 114, 114]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloParams {
    /// Square model input edge, in pixels.
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
        }
    }
}

/// Aspect-preserving placement of a source frame inside the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    /// Source pixels to model-input pixels.
    pub scale: f32,
    pub resized_width: u32,
    pub resized_height: u32,
    /// Left/top padding in model-input pixels.
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    /// Fit a `src_w` x `src_h` frame into `input_size` squared. Both source sides must be non-zero.
    pub fn fit(src_w: u32, src_h: u32, input_size: u32) -> Self {
        let target = input_size as f32;
        let scale = (target / src_w as f32).min(target / src_h as f32);
        let resized_width = ((src_w as f32 * scale).round() as u32).clamp(1, input_size);
        let resized_height = ((src_h as f32 * scale).round() as u32).clamp(1, input_size);
        Self {
            scale,
            resized_width,
            resized_height,
            pad_x: (input_size - resized_width) / 2,
            pad_y: (input_size - resized_height) / 2,
        }
    }

    /// Map a center/size box in model-input pixels back to the source frame.
    pub fn to_source(&self, cx: f32, cy: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox::from_center(
            (cx - self.pad_x as f32) / self.scale,
            (cy - self.pad_y as f32) / self.scale,
            w / self.scale,
            h / self.scale,
        )
    }
}

/// Resize `image` into an `input_size` square canvas, padding the short side.
pub fn letterbox_image(image: &DynamicImage, input_size: u32) -> (RgbImage, Letterbox) {
    let letterbox = Letterbox::fit(image.width(), image.height(), input_size);
    let resized = imageops::resize(
        &image.to_rgb8(),
        letterbox.resized_width,
        letterbox.resized_height,
        FilterType::Triangle,
    );
    let mut canvas = RgbImage::from_pixel(input_size, input_size, LETTERBOX_FILL);
    imageops::overlay(
        &mut canvas,
        &resized,
        i64::from(letterbox.pad_x),
        i64::from(letterbox.pad_y),
    );
    (canvas, letterbox)
}

/// Decode a raw head tensor into detections in source-image pixels.
pub fn decode(
    output: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    params: &YoloParams,
) -> Result<Vec<Detection>> {
    let (rows, cols) = match shape {
        [1, rows, cols] => (*rows, *cols),
        other => return Err(anyhow!("unexpected YOLO output shape {:?}", other)),
    };
    let channels_first = rows < cols;
    let (attrs, anchors) = if channels_first {
        (rows, cols)
    } else {
        (cols, rows)
    };
    if attrs <= BOX_ATTRS {
        return Err(anyhow!(
            "YOLO output has {} attributes per anchor, need more than {}",
            attrs,
            BOX_ATTRS
        ));
    }
    let expected = attrs
        .checked_mul(anchors)
        .ok_or_else(|| anyhow!("YOLO output dimensions overflow"))?;
    if output.len() != expected {
        return Err(anyhow!(
            "YOLO output holds {} values, shape {:?} needs {}",
            output.len(),
            shape,
            expected
        ));
    }

    let value = |anchor: usize, attr: usize| -> f32 {
        if channels_first {
            output[attr * anchors + anchor]
        } else {
            output[anchor * attrs + attr]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let (class_id, score) = (BOX_ATTRS..attrs)
            .map(|attr| (attr - BOX_ATTRS, value(anchor, attr)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .unwrap_or((0, f32::NEG_INFINITY));
        if !score.is_finite() || score < params.confidence_threshold {
            continue;
        }
        let bbox = letterbox.to_source(
            value(anchor, 0),
            value(anchor, 1),
            value(anchor, 2),
            value(anchor, 3),
        );
        candidates.push(Detection {
            class_id: class_id as u32,
            confidence: score,
            bbox,
        });
    }

    Ok(non_max_suppression(
        candidates,
        params.iou_threshold,
        params.max_detections,
    ))
}

/// Greedy per-class NMS, highest confidence first.
pub fn non_max_suppression(
    mut candidates: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    let mut kept: Vec<Detection> = Vec::new();
    for cand in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && k.bbox.iou(&cand.bbox) > iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}
