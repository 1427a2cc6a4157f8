//! Error type shared by every stage of map synthesis.

/// Errors surfaced by field generation, quilting, compositing and I/O.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A numeric parameter or table is unusable (zero sizes, bad weights, missing biomes).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Classification thresholds are empty, unsorted, or don't reach the field maximum.
    #[error("invalid classification table: {0}")]
    Classification(String),

    /// Two rasters that must line up have different sizes.
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    Dimensions {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Failed to decode or encode an image.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to read or write a file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON config.
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;

impl MapError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        MapError::Config(msg.into())
    }
}
