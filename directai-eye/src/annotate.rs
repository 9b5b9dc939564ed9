//! Bounding-box rendering for detection results

use crate::detection::Detection;
use crate::error::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

/// Line styling for annotated images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    /// Box outline thickness in pixels, drawn inward
    pub thickness: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self { thickness: 2 }
    }
}

/// Colour for a class label, derived from SHA-256 of the label so it does
/// not depend on process state or the order labels were seen in
pub fn label_color(label: &str) -> Rgb<u8> {
    let digest = Sha256::digest(label.as_bytes());
    // keep every channel away from black so outlines stay visible
    Rgb([digest[0] | 0x40, digest[1] | 0x40, digest[2] | 0x40])
}

pub fn draw_detections(image: &mut RgbImage, detections: &[Detection], style: &AnnotationStyle) {
    let (width, height) = image.dimensions();
    for detection in detections {
        let Some((x, y, w, h)) = detection.pixel_rect(width, height) else {
            debug!("Skipping box for '{}' outside the image", detection.label);
            continue;
        };

        let color = label_color(&detection.label);
        for inset in 0..style.thickness.max(1) {
            if w <= inset * 2 || h <= inset * 2 {
                break;
            }
            let rect = Rect::at(x + inset as i32, y + inset as i32)
                .of_size(w - inset * 2, h - inset * 2);
            draw_hollow_rect_mut(image, rect, color);
        }
    }
}

/// Decode `source`, draw `detections` on it and write the result to `destination`.
/// The output format follows the destination extension.
pub fn annotate_file(
    source: &Path,
    detections: &[Detection],
    destination: &Path,
    style: &AnnotationStyle,
) -> Result<()> {
    let mut image = image::open(source)?.to_rgb8();
    draw_detections(&mut image, detections, style);
    image.save(destination)?;
    debug!(
        "Wrote {} boxes to {}",
        detections.len(),
        destination.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, tlbr: [f32; 4]) -> Detection {
        Detection {
            tlbr,
            score: 0.9,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_label_color_is_stable() {
        assert_eq!(label_color("cat"), label_color("cat"));
        assert_ne!(label_color("cat"), label_color("dog"));
    }

    #[test]
    fn test_label_color_matches_sha256() {
        // sha256("cat") starts with 77 af 77 8b
        assert_eq!(label_color("cat"), Rgb([0x77, 0xef, 0x77]));
    }

    #[test]
    fn test_draw_outline_only() {
        let mut image = RgbImage::new(20, 20);
        let boxes = [detection("cat", [2.0, 2.0, 12.0, 12.0])];
        draw_detections(&mut image, &boxes, &AnnotationStyle { thickness: 1 });

        let color = label_color("cat");
        assert_eq!(*image.get_pixel(2, 2), color);
        assert_eq!(*image.get_pixel(12, 7), color);
        // interior stays untouched
        assert_eq!(*image.get_pixel(7, 7), Rgb([0, 0, 0]));
        // outside stays untouched
        assert_eq!(*image.get_pixel(15, 15), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_thickness_inward() {
        let mut image = RgbImage::new(20, 20);
        let boxes = [detection("dog", [2.0, 2.0, 12.0, 12.0])];
        draw_detections(&mut image, &boxes, &AnnotationStyle { thickness: 2 });

        let color = label_color("dog");
        assert_eq!(*image.get_pixel(3, 3), color);
        assert_eq!(*image.get_pixel(1, 1), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(4, 4), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_boxes_outside_image_are_skipped() {
        let mut image = RgbImage::new(10, 10);
        let boxes = [detection("cat", [50.0, 50.0, 60.0, 60.0])];
        draw_detections(&mut image, &boxes, &AnnotationStyle::default());
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_annotate_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("input.png");
        let destination = dir.path().join("annotated_input.png");
        RgbImage::new(16, 16).save(&source).unwrap();

        let boxes = [detection("cup", [1.0, 1.0, 8.0, 8.0])];
        annotate_file(&source, &boxes, &destination, &AnnotationStyle::default()).unwrap();

        let written = image::open(&destination).unwrap().to_rgb8();
        assert_eq!(*written.get_pixel(1, 1), label_color("cup"));
    }

    #[test]
    fn test_annotate_file_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let result = annotate_file(
            &dir.path().join("missing.png"),
            &[],
            &dir.path().join("out.png"),
            &AnnotationStyle::default(),
        );
        assert!(result.is_err());
    }
}
