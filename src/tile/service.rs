//! Tile Service for orchestrating tile generation.
//!
//! The TileService is the main entry point for tile requests. It orchestrates:
//! - Output format validation
//! - Slide access via the registry
//! - Coordinate validation against the slide's Deep Zoom pyramid
//! - Region reads and encoding on the blocking pool
//! - Result caching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         TileService                             │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                    get_tile()                           │    │
//! │  │  1. Parse format      4. Check cache                    │    │
//! │  │  2. Get slide         5. Read region, encode            │    │
//! │  │  3. Validate coords   6. Cache & return                 │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌───────────┐      ┌──────────────┐    ┌──────────────────┐  │
//! │    │ TileCache │      │ SlideRegistry│    │   TileEncoder    │  │
//! │    └───────────┘      └──────────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use image::RgbImage;
use tracing::debug;

use crate::error::TileError;
use crate::slide::{CachedSlide, SlideHandle, SlideRegistry, SlideSource, TileAddress};

use super::cache::{TileCache, TileCacheKey};
use super::encoder::{TileEncoder, TileFormat};

// =============================================================================
// Tile Request
// =============================================================================

/// A request for an encoded tile.
///
/// Coordinates are signed and the format is an unparsed extension, exactly as
/// they appear in a tile URL. The service does all validation.
#[derive(Debug, Clone)]
pub struct TileRequest {
    /// Slide identifier (file name inside the slide directory)
    pub slide_id: String,

    /// Deep Zoom level (0 = coarsest)
    pub level: i64,

    /// Tile column (0-indexed from left)
    pub col: i64,

    /// Tile row (0-indexed from top)
    pub row: i64,

    /// Requested output format extension (`jpeg` or `png`)
    pub format: String,
}

impl TileRequest {
    pub fn new(
        slide_id: impl Into<String>,
        level: i64,
        col: i64,
        row: i64,
        format: impl Into<String>,
    ) -> Self {
        Self {
            slide_id: slide_id.into(),
            level,
            col,
            row,
            format: format.into(),
        }
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The encoded tile data
    pub data: Bytes,

    /// Whether this tile was served from cache
    pub cache_hit: bool,

    /// Encoding of `data`
    pub format: TileFormat,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service for resolving, rendering and caching tiles.
///
/// # Type Parameters
///
/// * `S` - The slide source type (e.g., [`crate::slide::LocalSlideSource`])
///
/// # Example
///
/// ```ignore
/// use wsi_deepzoom::tile::{TileService, TileRequest};
/// use wsi_deepzoom::slide::SlideRegistry;
///
/// let registry = SlideRegistry::new(source);
/// let service = TileService::new(registry);
///
/// let request = TileRequest::new("CMU-1.svs", 12, 3, 4, "jpeg");
/// let response = service.get_tile(request).await?;
///
/// println!("Tile size: {} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct TileService<S: SlideSource> {
    /// The slide registry for accessing slides
    registry: Arc<SlideRegistry<S>>,

    /// Cache for encoded tiles
    cache: TileCache,

    /// Tile encoder
    encoder: TileEncoder,
}

impl<S: SlideSource> TileService<S> {
    /// Create a new tile service with default cache and encoder settings.
    pub fn new(registry: SlideRegistry<S>) -> Self {
        Self::with_shared_registry(Arc::new(registry))
    }

    /// Create a new tile service with a shared registry.
    ///
    /// The caller keeps its own handle to the registry, e.g. to clear it on
    /// shutdown.
    pub fn with_shared_registry(registry: Arc<SlideRegistry<S>>) -> Self {
        Self {
            registry,
            cache: TileCache::new(),
            encoder: TileEncoder::default(),
        }
    }

    /// Create a new tile service with custom cache capacity in bytes.
    pub fn with_cache_capacity(registry: SlideRegistry<S>, cache_capacity: usize) -> Self {
        Self::new(registry).with_cache(TileCache::with_capacity(cache_capacity))
    }

    /// Replace the tile cache.
    pub fn with_cache(mut self, cache: TileCache) -> Self {
        self.cache = cache;
        self
    }

    /// Replace the encoder.
    pub fn with_encoder(mut self, encoder: TileEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn registry(&self) -> &Arc<SlideRegistry<S>> {
        &self.registry
    }

    pub fn encoder(&self) -> &TileEncoder {
        &self.encoder
    }

    /// Acquire a slide from the registry.
    pub async fn slide(&self, slide_id: &str) -> Result<Arc<CachedSlide<S::Handle>>, TileError> {
        Ok(self.registry.get_slide(slide_id).await?)
    }

    /// Get an encoded tile, using the cache when available.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The format is not `jpeg` or `png` (checked before the slide is touched)
    /// - The slide cannot be found or opened
    /// - The level or tile coordinates are out of range
    /// - The region read or the encode fails
    pub async fn get_tile(&self, request: TileRequest) -> Result<TileResponse, TileError> {
        let format: TileFormat = request.format.parse()?;

        let slide = self.slide(&request.slide_id).await?;
        let address = slide
            .pyramid()
            .validate(request.level, request.col, request.row)?;

        // Keyed by generation so a re-opened slide never sees tiles
        // rendered from its previous handle
        let cache_key = TileCacheKey::new(
            request.slide_id.as_str(),
            slide.generation(),
            address.level(),
            address.col(),
            address.row(),
            format,
        );

        // Check cache first
        if let Some(cached_data) = self.cache.get(&cache_key).await {
            return Ok(TileResponse {
                data: cached_data,
                cache_hit: true,
                format,
            });
        }

        // Cache miss - render and encode on the blocking pool
        let encoder = self.encoder;
        let data = run_blocking(move || {
            let image = render_tile(&slide, address)?;
            encoder.encode(&image, format)
        })
        .await?;

        self.cache.put(cache_key, data.clone()).await;

        Ok(TileResponse {
            data,
            cache_hit: false,
            format,
        })
    }

    /// Get the decoded pixels of a tile, bypassing the encoded tile cache.
    ///
    /// The returned image is sized exactly to the clipped tile, overlap
    /// included.
    pub async fn get_tile_image(
        &self,
        slide_id: &str,
        level: i64,
        col: i64,
        row: i64,
    ) -> Result<RgbImage, TileError> {
        let slide = self.slide(slide_id).await?;
        let address = slide.pyramid().validate(level, col, row)?;
        run_blocking(move || render_tile(&slide, address)).await
    }

    /// Drop one slide and all its encoded tiles.
    ///
    /// The next request re-opens the slide from disk.
    pub async fn invalidate_slide(&self, slide_id: &str) {
        self.registry.invalidate(slide_id);
        let removed = self.cache.remove_slide(slide_id).await;
        debug!(slide_id = %slide_id, tiles = removed, "Invalidated slide tiles");
    }

    /// Get tile cache statistics.
    ///
    /// Returns `(current_size, capacity, entry_count)`.
    pub async fn cache_stats(&self) -> (usize, usize, usize) {
        let size = self.cache.size().await;
        let capacity = self.cache.capacity();
        let count = self.cache.len().await;
        (size, capacity, count)
    }

    /// Clear the tile cache.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

/// Read the pixels of one validated tile.
fn render_tile<H: SlideHandle>(
    slide: &CachedSlide<H>,
    address: TileAddress,
) -> Result<RgbImage, TileError> {
    let started = Instant::now();
    let geometry = slide
        .pyramid()
        .tile_geometry(address)
        .ok_or_else(|| TileError::DecodeFailure {
            message: format!("tile {:?} is outside the slide pyramid", address),
        })?;

    let output = (geometry.width, geometry.height);
    let image = slide
        .handle()
        .read_region(geometry.native, output)
        .map_err(|e| TileError::DecodeFailure {
            message: e.to_string(),
        })?;

    if image.dimensions() != output {
        return Err(TileError::DecodeFailure {
            message: format!(
                "decoder returned {}x{}, expected {}x{}",
                image.width(),
                image.height(),
                output.0,
                output.1
            ),
        });
    }

    debug!(
        slide_id = %slide.slide_id(),
        level = address.level(),
        col = address.col(),
        row = address.row(),
        width = output.0,
        height = output.1,
        elapsed_us = started.elapsed().as_micros() as u64,
        "Rendered tile"
    );

    Ok(image)
}

/// Run tile work on the blocking pool, folding task failures into the result.
async fn run_blocking<T, F>(work: F) -> Result<T, TileError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, TileError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TileError::DecodeFailure {
            message: format!("tile task failed: {}", e),
        })?
}

// =============================================================================
// Tests
// =============================================================================
