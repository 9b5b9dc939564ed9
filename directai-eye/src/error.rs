//! Error types for directai-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid detection: {0}")]
    InvalidDetection(String),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
