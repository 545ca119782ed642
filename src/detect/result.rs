use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Axis-aligned box in source image pixels (top-left origin).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    /// Build from a center/size box, as YOLO heads emit them.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            w,
            h,
        }
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Intersection over union.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Everything one forward pass found in a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Set of detected class identifiers.
    pub fn class_ids(&self) -> BTreeSet<u32> {
        self.detections.iter().map(|d| d.class_id).collect()
    }

    pub fn contains_class(&self, class_id: u32) -> bool {
        self.detections.iter().any(|d| d.class_id == class_id)
    }
}

/// Result of one `Detector::detect` call.
///
/// `NotDetected` and `Failed` lead to the same control flow (no notification)
/// but must never be confused in logs.
#[derive(Debug)]
pub enum DetectOutcome {
    /// Target present; annotated copy written to the contained path.
    Detected(PathBuf),
    NotDetected,
    Failed(anyhow::Error),
}

impl DetectOutcome {
    pub fn positive_path(&self) -> Option<&Path> {
        match self {
            DetectOutcome::Detected(path) => Some(path),
            DetectOutcome::NotDetected | DetectOutcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DetectOutcome::Failed(_))
    }
}
