//! HTTP server layer.
//!
//! This module exposes slides over the Deep Zoom protocol.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /slides/{slide_id}.dzi                                    │
//! │   GET /slides/{slide_id}_files/{level}/{col}_{row}.{format}     │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │     dzi     │  │        routes           │  │
//! │  │ (requests)  │  │ (XML, URLs) │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod dzi;
pub mod handlers;
pub mod routes;

pub use handlers::{
    dzi_handler, health_handler, heatmap_handler, metadata_handler, tile_handler, AppState,
    ErrorResponse, HealthResponse, HeatmapError, LevelMetadataResponse, SlideMetadataResponse,
    TILE_CACHE_HIT_HEADER,
};
pub use routes::{create_router, RouterConfig};
