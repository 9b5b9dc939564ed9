// Input file classification for inference uploads

use crate::error::{Error, Result};
use std::path::Path;

/// OS-generated files that never hold input data
pub const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

pub fn is_ignored_file_name(name: &str) -> bool {
    IGNORED_FILE_NAMES.contains(&name)
}

/// Image formats accepted by the inference endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
}

impl MediaType {
    /// Classify by file extension, case-insensitively
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("jpg") | Some("jpeg") => Ok(MediaType::Jpeg),
            Some("png") => Ok(MediaType::Png),
            _ => Err(Error::UnsupportedMediaType(format!(
                "{} is an unsupported image type",
                path.display()
            ))),
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }
}
