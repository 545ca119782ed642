//! Draw detections onto a frame and save the result.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detect::result::{BoundingBox, Detection};

const TARGET_COLOR: Rgb<u8> = Rgb([255, 64, 0]);
const OTHER_COLOR: Rgb<u8> = Rgb([0, 200, 255]);
const BORDER_PX: i32 = 2;

/// Draw every detection, target class in a distinct color, and write a JPEG to `output`.
pub fn save_annotated(
    image: &DynamicImage,
    detections: &[Detection],
    target_class: u32,
    output: &Path,
) -> Result<()> {
    let mut canvas = image.to_rgb8();
    let (img_w, img_h) = canvas.dimensions();
    if img_w == 0 || img_h == 0 {
        anyhow::bail!("cannot annotate image with zero dimensions");
    }

    for detection in detections {
        let color = if detection.class_id == target_class {
            TARGET_COLOR
        } else {
            OTHER_COLOR
        };
        draw_box(&mut canvas, &detection.bbox, color);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    canvas
        .save_with_format(output, image::ImageFormat::Jpeg)
        .with_context(|| format!("failed to save annotated image {}", output.display()))?;
    Ok(())
}

fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (img_w, img_h) = canvas.dimensions();
    let Some(rect) = rect_from_bbox(bbox, img_w, img_h) else {
        return;
    };
    // Concentric rectangles give a thicker border.
    for inset in 0..BORDER_PX {
        let w = rect.width() as i32 - 2 * inset;
        let h = rect.height() as i32 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let r = Rect::at(rect.left() + inset, rect.top() + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, r, color);
    }
}

/// Clamp a box to the image; `None` if nothing of it is visible.
fn rect_from_bbox(bbox: &BoundingBox, img_w: u32, img_h: u32) -> Option<Rect> {
    let max_x = (img_w - 1) as f32;
    let max_y = (img_h - 1) as f32;

    let x1 = bbox.x.clamp(0.0, max_x);
    let y1 = bbox.y.clamp(0.0, max_y);
    let x2 = (bbox.x + bbox.w).clamp(0.0, max_x);
    let y2 = (bbox.y + bbox.h).clamp(0.0, max_y);
    if !(x2 > x1 && y2 > y1) {
        return None;
    }

    let width = (x2 - x1).max(1.0).round() as u32;
    let height = (y2 - y1).max(1.0).round() as u32;
    Some(Rect::at(x1.round() as i32, y1.round() as i32).of_size(width, height))
}
