//! Error types surfaced to the user.
//!
//! Messages are written to be shown as-is in the status bar.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    /// The image could not be read or decoded
    #[error("Failed to load image: {0}")]
    Load(#[source] image::ImageError),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data URL: {0}")]
    DataUrl(String),

    #[error("Unsupported image source: {0}")]
    UnsupportedSource(String),

    /// Rounded crop width or height is zero or negative
    #[error("Invalid crop area ({width}×{height})")]
    InvalidCropArea { width: i64, height: i64 },

    /// The output buffer for the crop cannot be allocated
    #[error("Cannot create a {width}×{height} output image")]
    BufferUnavailable { width: u64, height: u64 },

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No configuration directory available")]
    NoConfigDir,
}
