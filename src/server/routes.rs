//! Router configuration.
//!
//! This module defines the HTTP routes and applies CORS and tracing layers.
//!
//! # Route Structure
//!
//! ```text
//! /health                                          - Health check
//! /slides/{slide_id}.dzi                           - DZI descriptor
//! /slides/{slide_id}_files/{level}/{col}_{row}.{format}  - Tile
//! /slides/{slide_id}/metadata                      - Pyramid metadata
//! /heatmaps/{filename}                             - Heatmap files
//! ```
//!
//! The `.dzi` and `_files` suffixes are part of a single path segment, so the
//! router captures whole segments and the handlers split them.
//!
//! # Example
//!
//! ```ignore
//! use wsi_deepzoom::server::{create_router, RouterConfig};
//! use wsi_deepzoom::slide::{LocalSlideSource, RasterDecoder, SlideRegistry};
//! use wsi_deepzoom::tile::TileService;
//!
//! let source = LocalSlideSource::new("slides", RasterDecoder::new());
//! let tile_service = TileService::new(SlideRegistry::new(source));
//!
//! let config = RouterConfig::new()
//!     .with_heatmap_dir("heatmaps")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    dzi_handler, health_handler, heatmap_handler, metadata_handler, tile_handler, AppState,
};
use crate::slide::SlideSource;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds for tiles and descriptors
    pub cache_max_age: u32,

    /// Enable request tracing
    pub enable_tracing: bool,

    /// Directory heatmap files are served from
    pub heatmap_dir: PathBuf,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a configuration with defaults: any origin, one hour max-age,
    /// tracing on, heatmaps from `./heatmaps`.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
            heatmap_dir: PathBuf::from("heatmaps"),
        }
    }

    /// Restrict CORS to specific origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    pub fn with_heatmap_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.heatmap_dir = dir.into();
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router<S>(tile_service: TileService<S>, config: RouterConfig) -> Router
where
    S: SlideSource,
{
    let app_state = AppState::with_cache_max_age(tile_service, config.cache_max_age)
        .with_heatmap_dir(config.heatmap_dir.clone());

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/slides/{slide}", get(dzi_handler::<S>))
        .route("/slides/{slide}/metadata", get(metadata_handler::<S>))
        .route("/slides/{slide}/{level}/{tile}", get(tile_handler::<S>))
        .route("/heatmaps/{filename}", get(heatmap_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        // No origins allowed - effectively disables CORS
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
