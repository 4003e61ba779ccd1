//! # WSI Deep Zoom
//!
//! A Deep Zoom tile server for Whole Slide Images (WSI) stored on local disk.
//!
//! Slides are opened lazily, kept in a bounded cache together with their
//! derived Deep Zoom pyramid, and cut into overlapping tiles on request so
//! that any Deep Zoom viewer (OpenSeadragon and friends) can pan and zoom
//! across multi-gigapixel scans.
//!
//! ## Features
//!
//! - **Deep Zoom addressing**: level/tile arithmetic with overlap and edge clipping
//! - **Single-flight slide cache**: each slide is opened once, failures included
//! - **Encoded tile cache**: size-bounded LRU of JPEG/PNG tiles
//! - **Heatmap files**: pre-generated overlays served next to the slides
//!
//! ## Architecture
//!
//! - [`slide`] - Pyramid descriptor, decoder traits and the slide registry
//! - [`tile`] - Tile resolution, encoding and caching
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types shared by all layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_deepzoom::{create_router, LocalSlideSource, RasterDecoder, RouterConfig};
//! use wsi_deepzoom::{SlideRegistry, TileService};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let source = LocalSlideSource::new("slides", RasterDecoder::new());
//!     let service = TileService::new(SlideRegistry::new(source));
//!     let router = create_router(service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod server;
pub mod slide;
pub mod tile;

// Re-export commonly used types
pub use config::Config;
pub use error::{DecoderError, PyramidError, SlideError, TileError};
pub use server::{
    create_router, dzi_handler, health_handler, heatmap_handler, metadata_handler, tile_handler,
    AppState, ErrorResponse, HealthResponse, LevelMetadataResponse, RouterConfig,
    SlideMetadataResponse, TILE_CACHE_HIT_HEADER,
};
pub use slide::{
    CachedSlide, DeepZoomPyramid, LevelInfo, LocalSlideSource, NativeRegion, RasterDecoder,
    RasterHandle, SlideDecoder, SlideHandle, SlideRegistry, SlideSource, TileAddress,
    TileGeometry,
};
pub use tile::{
    TileCache, TileCacheKey, TileEncoder, TileFormat, TileRequest, TileResponse, TileService,
    DEFAULT_JPEG_QUALITY, DEFAULT_TILE_CACHE_CAPACITY,
};
