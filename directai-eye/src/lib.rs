//! directai-eye: detection payloads and bounding-box rendering
//!
//! Parses the detections returned by the `/detect` endpoint and draws them
//! onto a decoded copy of the source image. Each class label maps to a fixed
//! colour so the same label renders identically within and across runs.

pub mod annotate;
pub mod detection;
pub mod error;

pub use annotate::{annotate_file, draw_detections, label_color, AnnotationStyle};
pub use detection::{first_image, parse_detections, Detection};
pub use error::AnnotateError;
