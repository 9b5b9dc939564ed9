//! Detection payloads returned by the `/detect` endpoint

use crate::error::{AnnotateError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Box corners as `[x1, y1, x2, y2]` (top-left, bottom-right)
    pub tlbr: [f32; 4],
    pub score: f32,
    #[serde(rename = "class")]
    pub label: String,
}

impl Detection {
    /// Integer pixel box `(x, y, width, height)` clamped to the image bounds,
    /// or `None` if nothing of the box lies inside the image
    pub fn pixel_rect(&self, image_width: u32, image_height: u32) -> Option<(i32, i32, u32, u32)> {
        let [x1, y1, x2, y2] = self.tlbr;
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));

        let left = left.max(0.0).round() as i64;
        let top = top.max(0.0).round() as i64;
        let right = (right.round() as i64).min(image_width as i64 - 1);
        let bottom = (bottom.round() as i64).min(image_height as i64 - 1);

        if right < left || bottom < top {
            return None;
        }

        let width = (right - left + 1) as u32;
        let height = (bottom - top + 1) as u32;
        Some((left as i32, top as i32, width, height))
    }
}

/// The service answers with one detection list per submitted image; a single
/// upload therefore arrives as `[[...]]`. Returns the list for the first image,
/// or the payload itself when it is already flat.
pub fn first_image(payload: &Value) -> &Value {
    match payload.as_array().and_then(|items| items.first()) {
        Some(first) if first.is_array() => first,
        _ => payload,
    }
}

pub fn parse_detections(payload: &Value) -> Result<Vec<Detection>> {
    let items = first_image(payload)
        .as_array()
        .ok_or_else(|| AnnotateError::InvalidDetection("expected a list of detections".to_string()))?;

    items
        .iter()
        .map(|item| {
            let detection: Detection = serde_json::from_value(item.clone())
                .map_err(|e| AnnotateError::InvalidDetection(e.to_string()))?;
            if detection.tlbr.iter().any(|v| !v.is_finite()) {
                return Err(AnnotateError::InvalidDetection(format!(
                    "non-finite box for '{}'",
                    detection.label
                )));
            }
            Ok(detection)
        })
        .collect()
}
