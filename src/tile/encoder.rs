//! Tile image encoder.
//!
//! Rendered tiles are RGB pixel buffers. This module turns them into the
//! byte stream a viewer asked for: JPEG at the configured quality, or PNG.
//!
//! # Design Decisions
//!
//! - **Two formats only**: `jpeg` and `png`. Anything else, including the
//!   `jpg` spelling, is rejected before any slide work happens.
//!
//! - **Fixed quality**: JPEG quality is a server setting, not a request
//!   parameter, so identical requests always produce identical bytes.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::TileError;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// TileFormat
// =============================================================================

/// Output encoding of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileFormat {
    Jpeg,
    Png,
}

impl TileFormat {
    /// Parse a tile file extension. Only `jpeg` and `png` are accepted.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpeg" => Some(TileFormat::Jpeg),
            "png" => Some(TileFormat::Png),
            _ => None,
        }
    }

    /// File extension used in tile URLs and DZI descriptors.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Jpeg => "jpeg",
            TileFormat::Png => "png",
        }
    }

    /// MIME type for the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        match self {
            TileFormat::Jpeg => "image/jpeg",
            TileFormat::Png => "image/png",
        }
    }
}

impl FromStr for TileFormat {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TileFormat::from_extension(s).ok_or_else(|| TileError::UnsupportedFormat {
            format: s.to_string(),
        })
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// =============================================================================
// TileEncoder
// =============================================================================

/// Encodes rendered tiles.
///
/// # Example
///
/// ```
/// use wsi_deepzoom::tile::{TileEncoder, TileFormat};
/// use image::RgbImage;
///
/// let encoder = TileEncoder::new(80);
/// let tile = RgbImage::new(4, 4);
/// let jpeg = encoder.encode(&tile, TileFormat::Jpeg).unwrap();
/// assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TileEncoder {
    jpeg_quality: u8,
}

impl Default for TileEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl TileEncoder {
    /// Create an encoder. Quality is clamped to 1-100.
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: clamp_quality(jpeg_quality),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Encode `image` in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::EncodeFailure`] if the codec rejects the image.
    pub fn encode(&self, image: &RgbImage, format: TileFormat) -> Result<Bytes, TileError> {
        let mut output = Vec::new();

        let result = match format {
            TileFormat::Jpeg => {
                JpegEncoder::new_with_quality(&mut output, self.jpeg_quality).encode_image(image)
            }
            TileFormat::Png => PngEncoder::new(&mut output).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            ),
        };

        result.map_err(|e| TileError::EncodeFailure {
            message: e.to_string(),
        })?;

        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Validate JPEG quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&quality)
}

/// Clamp quality to valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

// =============================================================================
// Tests
// =============================================================================
