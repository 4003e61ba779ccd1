use thiserror::Error;

/// Errors raised while deriving a Deep Zoom pyramid from image dimensions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PyramidError {
    /// Image has no pixels in at least one direction
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Tile edge length must be at least one pixel
    #[error("Invalid tile size: {0}")]
    InvalidTileSize(u32),
}

/// Errors reported by a slide decoder
#[derive(Debug, Clone, Error)]
pub enum DecoderError {
    /// File could not be read from disk
    #[error("I/O error: {0}")]
    Io(String),

    /// File is not in a format the decoder understands
    #[error("Unsupported image format: {0}")]
    Unsupported(String),

    /// File is in a known format but its contents are broken
    #[error("Corrupt image data: {0}")]
    Corrupt(String),

    /// Region read failed on an already opened handle
    #[error("Region read failed: {0}")]
    Read(String),
}

impl From<image::ImageError> for DecoderError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => DecoderError::Io(e.to_string()),
            image::ImageError::Unsupported(e) => DecoderError::Unsupported(e.to_string()),
            other => DecoderError::Corrupt(other.to_string()),
        }
    }
}

/// Errors from the slide registry.
///
/// Both variants are cached per slide identifier, so every later request for
/// the same slide sees the same error without touching the filesystem again.
#[derive(Debug, Clone, Error)]
pub enum SlideError {
    /// The identifier does not resolve to an existing file
    #[error("Slide not found: {slide_id}")]
    SlideNotFound { slide_id: String },

    /// The file exists but the decoder rejected it
    #[error("Slide {slide_id} could not be opened: {reason}")]
    SlideUnreadable { slide_id: String, reason: String },
}

impl SlideError {
    /// The slide identifier this error refers to.
    pub fn slide_id(&self) -> &str {
        match self {
            SlideError::SlideNotFound { slide_id } => slide_id,
            SlideError::SlideUnreadable { slide_id, .. } => slide_id,
        }
    }
}

/// Errors that can occur while resolving or encoding a tile
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// Slide could not be acquired from the registry
    #[error("Tile source unavailable: {0}")]
    SlideUnavailable(#[from] SlideError),

    /// Level is outside `[0, level_count)`
    #[error("Invalid level {level}: slide has {level_count} levels")]
    InvalidLevel { level: i64, level_count: u32 },

    /// Column or row is outside the tile grid of the level
    #[error("Invalid tile ({col}, {row}) at level {level}: grid is {cols}x{rows}")]
    InvalidTileCoordinate {
        level: u32,
        col: i64,
        row: i64,
        cols: u32,
        rows: u32,
    },

    /// Requested tile format is neither jpeg nor png
    #[error("Unsupported tile format: {format}")]
    UnsupportedFormat { format: String },

    /// Tile path segment could not be parsed
    #[error("Invalid tile path: {path}")]
    InvalidTilePath { path: String },

    /// Decoder failed while reading a region from an open slide
    #[error("Failed to decode tile: {message}")]
    DecodeFailure { message: String },

    /// Encoder failed to produce the output byte stream
    #[error("Failed to encode tile: {message}")]
    EncodeFailure { message: String },
}
