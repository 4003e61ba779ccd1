//! Deep Zoom pyramid arithmetic.
//!
//! A Deep Zoom pyramid is derived purely from the native image dimensions.
//! Level numbering is inverted compared to most WSI formats:
//! - level 0 is the coarsest level (1x1 pixel, or close to it)
//! - level `level_count - 1` is the full native resolution
//!
//! Each level is halved (rounding up) relative to the next one and split into
//! square tiles of `tile_size` pixels. Tiles carry `overlap` extra pixels on
//! every edge that has a neighbouring tile, so a viewer can stitch them without
//! seams. Edge tiles are smaller than interior tiles; nothing is padded.
//!
//! # Example
//!
//! ```
//! use wsi_deepzoom::slide::DeepZoomPyramid;
//!
//! let pyramid = DeepZoomPyramid::build(1000, 800, 254, 1).unwrap();
//! assert_eq!(pyramid.level_count(), 11);
//! assert_eq!(pyramid.level_dimensions(10), Some((1000, 800)));
//! assert_eq!(pyramid.tile_count(10), Some((4, 4)));
//! ```

use crate::error::{PyramidError, TileError};

/// Default tile edge length, excluding overlap.
pub const DEFAULT_TILE_SIZE: u32 = 254;

/// Default number of overlap pixels on each interior tile edge.
pub const DEFAULT_OVERLAP: u32 = 1;

// =============================================================================
// Level and Tile Types
// =============================================================================

/// Dimensions and tile grid of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    /// Width of this level in pixels
    pub width: u32,

    /// Height of this level in pixels
    pub height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,
}

/// A tile address that has been checked against a pyramid.
///
/// Only [`DeepZoomPyramid::validate`] creates these, so holding one means the
/// level and grid coordinates were in range for that pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    level: u32,
    col: u32,
    row: u32,
}

impl TileAddress {
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn row(&self) -> u32 {
        self.row
    }
}

/// A rectangle in native (full resolution) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeRegion {
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

/// Where a tile lives in its level and in the native image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGeometry {
    /// Left edge in level pixels, overlap included
    pub x: u32,

    /// Top edge in level pixels, overlap included
    pub y: u32,

    /// Output width in pixels, overlap included
    pub width: u32,

    /// Output height in pixels, overlap included
    pub height: u32,

    /// Width of the tile body, without overlap
    pub content_width: u32,

    /// Height of the tile body, without overlap
    pub content_height: u32,

    /// Downsample factor of the level relative to native resolution
    pub downsample: u64,

    /// Source rectangle at native resolution, clamped to the image bounds
    pub native: NativeRegion,
}

// =============================================================================
// DeepZoomPyramid
// =============================================================================

/// Immutable Deep Zoom level structure for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepZoomPyramid {
    width: u32,
    height: u32,
    tile_size: u32,
    overlap: u32,
    levels: Vec<LevelInfo>,
}

impl DeepZoomPyramid {
    /// Derive the pyramid for an image of `width` x `height` native pixels.
    ///
    /// `level_count = ceil(log2(max(width, height))) + 1`, and level `L` has
    /// dimensions `ceil(native / 2^(level_count - 1 - L))`.
    ///
    /// # Errors
    ///
    /// Fails if either dimension is zero or `tile_size` is zero.
    pub fn build(
        width: u32,
        height: u32,
        tile_size: u32,
        overlap: u32,
    ) -> Result<Self, PyramidError> {
        if width == 0 || height == 0 {
            return Err(PyramidError::InvalidDimensions { width, height });
        }
        if tile_size == 0 {
            return Err(PyramidError::InvalidTileSize(tile_size));
        }

        let level_count = max_level(width, height) + 1;
        let levels = (0..level_count)
            .map(|level| {
                let scale = 1u64 << (level_count - 1 - level);
                let level_width = (width as u64).div_ceil(scale) as u32;
                let level_height = (height as u64).div_ceil(scale) as u32;
                LevelInfo {
                    width: level_width,
                    height: level_height,
                    tiles_x: level_width.div_ceil(tile_size),
                    tiles_y: level_height.div_ceil(tile_size),
                }
            })
            .collect();

        Ok(Self {
            width,
            height,
            tile_size,
            overlap,
            levels,
        })
    }

    /// Native image dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    /// Number of levels; always at least 1.
    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// All levels, coarsest first.
    pub fn levels(&self) -> &[LevelInfo] {
        &self.levels
    }

    pub fn level(&self, level: u32) -> Option<&LevelInfo> {
        self.levels.get(level as usize)
    }

    /// Dimensions of a level, or `None` if the level is out of range.
    pub fn level_dimensions(&self, level: u32) -> Option<(u32, u32)> {
        self.level(level).map(|info| (info.width, info.height))
    }

    /// Tile grid `(tiles_x, tiles_y)` of a level.
    pub fn tile_count(&self, level: u32) -> Option<(u32, u32)> {
        self.level(level).map(|info| (info.tiles_x, info.tiles_y))
    }

    /// Downsample factor of a level: `2^(level_count - 1 - level)`.
    pub fn downsample(&self, level: u32) -> Option<u64> {
        if level >= self.level_count() {
            return None;
        }
        Some(1u64 << (self.level_count() - 1 - level))
    }

    /// Check request coordinates against this pyramid.
    ///
    /// Coordinates arrive signed from the HTTP layer so that negative values
    /// are reported as range errors instead of parse errors.
    pub fn validate(&self, level: i64, col: i64, row: i64) -> Result<TileAddress, TileError> {
        let level_count = self.level_count();
        let level_idx = u32::try_from(level)
            .ok()
            .filter(|l| *l < level_count)
            .ok_or(TileError::InvalidLevel { level, level_count })?;

        let info = self.levels[level_idx as usize];
        let col_idx = u32::try_from(col).ok().filter(|c| *c < info.tiles_x);
        let row_idx = u32::try_from(row).ok().filter(|r| *r < info.tiles_y);

        match (col_idx, row_idx) {
            (Some(col), Some(row)) => Ok(TileAddress {
                level: level_idx,
                col,
                row,
            }),
            _ => Err(TileError::InvalidTileCoordinate {
                level: level_idx,
                col,
                row,
                cols: info.tiles_x,
                rows: info.tiles_y,
            }),
        }
    }

    /// Compute the level rectangle and native source region of a tile.
    ///
    /// Returns `None` if the address does not belong to this pyramid.
    pub fn tile_geometry(&self, address: TileAddress) -> Option<TileGeometry> {
        let info = self.level(address.level)?;
        if address.col >= info.tiles_x || address.row >= info.tiles_y {
            return None;
        }
        let downsample = self.downsample(address.level)?;

        let (x, width, content_width) = axis_span(
            address.col,
            info.tiles_x,
            info.width,
            self.tile_size,
            self.overlap,
        );
        let (y, height, content_height) = axis_span(
            address.row,
            info.tiles_y,
            info.height,
            self.tile_size,
            self.overlap,
        );

        let native_x = x * downsample;
        let native_y = y * downsample;
        let native = NativeRegion {
            x: native_x,
            y: native_y,
            width: (width * downsample).min(self.width as u64 - native_x),
            height: (height * downsample).min(self.height as u64 - native_y),
        };

        Some(TileGeometry {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
            content_width: content_width as u32,
            content_height: content_height as u32,
            downsample,
            native,
        })
    }
}

/// `ceil(log2(max(width, height)))`, with 0 for a 1x1 image.
fn max_level(width: u32, height: u32) -> u32 {
    let max_dim = width.max(height);
    u32::BITS - (max_dim - 1).leading_zeros()
}

/// Start, length and body length of a tile along one axis, in level pixels.
///
/// The first tile gets no leading overlap and the last tile no trailing
/// overlap; the span never leaves `[0, level_len)`.
fn axis_span(index: u32, tiles: u32, level_len: u32, tile_size: u32, overlap: u32) -> (u64, u64, u64) {
    let index = index as u64;
    let level_len = level_len as u64;
    let tile_size = tile_size as u64;
    let overlap = overlap as u64;

    let body_start = index * tile_size;
    let body_len = tile_size.min(level_len - body_start);

    let leading = if index > 0 { overlap.min(body_start) } else { 0 };
    let trailing = if index + 1 < tiles as u64 { overlap } else { 0 };

    let start = body_start - leading;
    let end = (body_start + body_len + trailing).min(level_len);

    (start, end - start, body_len)
}

// =============================================================================
// Tests
// =============================================================================
