//! Tile service layer.
//!
//! This module turns validated Deep Zoom tile addresses into encoded images.
//!
//! # Architecture
//!
//! The tile service sits between the HTTP layer and the slide abstraction:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │   TileEncoder   │  │
//! │  │  (encoded    │  │  (RGB → JPEG    │  │
//! │  │   tiles)     │  │   or PNG)       │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SlideRegistry                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point for tile requests
//! - [`TileCache`]: LRU cache for encoded tiles with size-based eviction
//! - [`TileCacheKey`]: Composite key (slide, generation, level, column, row, format)
//! - [`TileEncoder`]: Encodes RGB tiles as JPEG or PNG
//! - [`TileRequest`] / [`TileResponse`]: Request parameters and result
//!
//! # Example
//!
//! ```
//! use wsi_deepzoom::tile::{TileCache, TileCacheKey, TileFormat};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Create a cache with 50MB capacity
//!     let cache = TileCache::with_capacity(50 * 1024 * 1024);
//!
//!     let key = TileCacheKey::new("CMU-1.svs", 0, 12, 1, 2, TileFormat::Jpeg);
//!
//!     if cache.get(&key).await.is_none() {
//!         let tile_data = Bytes::from(vec![0xFF, 0xD8]);
//!         cache.put(key, tile_data).await;
//!     }
//! }
//! ```

mod cache;
mod encoder;
mod service;

pub use cache::{TileCache, TileCacheKey, DEFAULT_TILE_CACHE_CAPACITY};
pub use encoder::{
    clamp_quality, is_valid_quality, TileEncoder, TileFormat, DEFAULT_JPEG_QUALITY,
    MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use service::{TileRequest, TileResponse, TileService};
