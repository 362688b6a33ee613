//
// error.rs
// Dicom-Inspect-rs
//
// Error type shared by the value encoder, the conformance checker and the native frame decoder.
//
// Thales Matheus Mendonça Santos - November 2025

use crate::value::{Tag, ValueKind};

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The tag has no entry in any known dictionary. Non-fatal for encoding.
    #[error("tag {0} not found in dictionary")]
    TagNotFound(Tag),

    #[error("value representation {vr} expects {expected} but element {tag} holds {actual}")]
    ConformanceMismatch {
        vr: String,
        tag: Tag,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("unsupported bits per sample: {0}")]
    UnsupportedBitDepth(u16),

    #[error("pixel ({x},{y}) out of bounds for a {cols}x{rows} frame")]
    PixelOutOfBounds { x: u32, y: u32, cols: u32, rows: u32 },

    #[error("sample offset {offset}..{end} exceeds frame buffer of {len} bytes")]
    BufferOutOfBounds { offset: usize, end: usize, len: usize },

    #[error("{0} samples per pixel cannot be rendered as a grayscale image")]
    UnsupportedChannelLayout(u16),

    #[error("invalid dictionary entry: {0}")]
    InvalidDictionary(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
