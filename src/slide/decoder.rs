//! Slide decoding.
//!
//! The tile pipeline talks to slide files through two traits:
//!
//! - [`SlideDecoder`] turns a path into an open handle
//! - [`SlideHandle`] reports the native size and reads scaled regions
//!
//! Both are synchronous. Callers run them on the blocking thread pool, which
//! keeps decoder libraries free of any async requirements.
//!
//! [`RasterDecoder`] is the built-in implementation. It decodes any raster
//! format supported by the `image` crate (JPEG, PNG, TIFF) fully into memory
//! and keeps a stack of halved copies so coarse reads stay cheap.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};

use crate::error::DecoderError;
use crate::slide::pyramid::NativeRegion;

/// Halved copies stop once the longer edge drops to this size.
const MIN_LEVEL_DIMENSION: u32 = 256;

// =============================================================================
// Traits
// =============================================================================

/// Opens slide files.
pub trait SlideDecoder: Send + Sync + 'static {
    /// Handle type produced by this decoder.
    type Handle: SlideHandle;

    /// Open the file at `path`.
    fn open(&self, path: &Path) -> Result<Self::Handle, DecoderError>;
}

/// An open slide.
///
/// Handles are shared between request tasks through an `Arc`, so
/// [`read_region`](SlideHandle::read_region) may be called concurrently from
/// several threads. Implementations backed by a library without thread-safe
/// reads must serialize access internally.
pub trait SlideHandle: Send + Sync + 'static {
    /// Native (full resolution) dimensions as `(width, height)`.
    fn native_size(&self) -> (u32, u32);

    /// Read `region` (native coordinates) and scale it to exactly `output`.
    fn read_region(
        &self,
        region: NativeRegion,
        output: (u32, u32),
    ) -> Result<RgbImage, DecoderError>;
}

// =============================================================================
// RasterDecoder
// =============================================================================

/// Decoder for plain raster images.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl SlideDecoder for RasterDecoder {
    type Handle = RasterHandle;

    fn open(&self, path: &Path) -> Result<RasterHandle, DecoderError> {
        let reader = ImageReader::open(path)
            .map_err(|e| DecoderError::Io(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| DecoderError::Io(e.to_string()))?;

        if reader.format().is_none() {
            return Err(DecoderError::Unsupported(format!(
                "unrecognized file contents: {}",
                path.display()
            )));
        }

        let image = reader.decode()?;
        RasterHandle::from_image(image)
    }
}

/// A fully decoded raster image with precomputed halved levels.
pub struct RasterHandle {
    width: u32,
    height: u32,
    /// `levels[i]` is the image downsampled by `2^i`, rounding dimensions up.
    levels: Vec<RgbImage>,
}

impl RasterHandle {
    /// Build a handle from an already decoded image.
    pub fn from_image(image: DynamicImage) -> Result<Self, DecoderError> {
        let base = image.into_rgb8();
        let (width, height) = base.dimensions();
        if width == 0 || height == 0 {
            return Err(DecoderError::Corrupt(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        let mut levels = vec![base];
        loop {
            let (w, h) = levels[levels.len() - 1].dimensions();
            if w.max(h) <= MIN_LEVEL_DIMENSION {
                break;
            }
            let next = imageops::resize(
                &levels[levels.len() - 1],
                w.div_ceil(2),
                h.div_ceil(2),
                FilterType::Triangle,
            );
            levels.push(next);
        }

        Ok(Self {
            width,
            height,
            levels,
        })
    }

    /// Number of in-memory levels, including the native image.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl std::fmt::Debug for RasterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterHandle")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("levels", &self.levels.len())
            .finish()
    }
}

impl SlideHandle for RasterHandle {
    fn native_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_region(
        &self,
        region: NativeRegion,
        output: (u32, u32),
    ) -> Result<RgbImage, DecoderError> {
        let (out_w, out_h) = output;
        if out_w == 0 || out_h == 0 || region.width == 0 || region.height == 0 {
            return Err(DecoderError::Read(format!(
                "empty region {:?} -> {}x{}",
                region, out_w, out_h
            )));
        }
        if region.x + region.width > self.width as u64
            || region.y + region.height > self.height as u64
        {
            return Err(DecoderError::Read(format!(
                "region {:?} exceeds image bounds {}x{}",
                region, self.width, self.height
            )));
        }

        let target = (region.width as f64 / out_w as f64).min(region.height as f64 / out_h as f64);
        let level = best_level(self.levels.len(), target);
        let source = &self.levels[level];
        let scale = 1u64 << level;

        let (level_w, level_h) = source.dimensions();
        let x = (region.x / scale) as u32;
        let y = (region.y / scale) as u32;
        let x_end = ((region.x + region.width).div_ceil(scale) as u32).min(level_w);
        let y_end = ((region.y + region.height).div_ceil(scale) as u32).min(level_h);
        let crop_w = (x_end - x).max(1);
        let crop_h = (y_end - y).max(1);

        let cropped = imageops::crop_imm(source, x, y, crop_w, crop_h).to_image();
        if cropped.dimensions() == output {
            return Ok(cropped);
        }
        Ok(imageops::resize(&cropped, out_w, out_h, FilterType::Triangle))
    }
}

/// Pick the coarsest level that still has at least the requested resolution.
///
/// Level `i` has downsample `2^i`; the result never requires upscaling unless
/// the target is below 1.
fn best_level(level_count: usize, target_downsample: f64) -> usize {
    let mut best = 0;
    for level in 0..level_count {
        if (1u64 << level) as f64 <= target_downsample {
            best = level;
        }
    }
    best
}
