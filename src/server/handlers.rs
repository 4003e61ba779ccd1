//! HTTP request handlers for the Deep Zoom API.
//!
//! # Endpoints
//!
//! - `GET /slides/{slide_id}.dzi` - DZI descriptor
//! - `GET /slides/{slide_id}_files/{level}/{col}_{row}.{format}` - Serve a tile
//! - `GET /slides/{slide_id}/metadata` - Pyramid metadata as JSON
//! - `GET /heatmaps/{filename}` - Serve a pre-generated heatmap file
//! - `GET /health` - Health check endpoint

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{SlideError, TileError};
use crate::slide::{join_file_name, SlideSource};
use crate::tile::{TileFormat, TileRequest, TileService};

use super::dzi::{
    generate_dzi_xml, parse_coordinate, parse_tile_name, slide_id_from_dzi, slide_id_from_files,
};

/// Response header reporting whether a tile came from the encoded tile cache.
pub const TILE_CACHE_HIT_HEADER: &str = "x-tile-cache-hit";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: SlideSource> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<S>>,

    /// Cache control max-age in seconds for tiles and descriptors
    pub cache_max_age: u32,

    /// Directory heatmap files are served from
    pub heatmap_dir: Arc<FsPath>,
}

impl<S: SlideSource> AppState<S> {
    /// Create a new application state with the given tile service.
    pub fn new(tile_service: TileService<S>) -> Self {
        Self::with_cache_max_age(tile_service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(tile_service: TileService<S>, cache_max_age: u32) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age,
            heatmap_dir: Arc::from(FsPath::new("heatmaps")),
        }
    }

    /// Serve heatmaps from `dir`.
    pub fn with_heatmap_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir: PathBuf = dir.into();
        self.heatmap_dir = Arc::from(dir);
        self
    }

    fn cache_control(&self) -> String {
        format!("public, max-age={}", self.cache_max_age)
    }
}

impl<S: SlideSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            cache_max_age: self.cache_max_age,
            heatmap_dir: Arc::clone(&self.heatmap_dir),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "slide_not_found", "invalid_level")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Metadata for a single Deep Zoom level.
#[derive(Debug, Serialize)]
pub struct LevelMetadataResponse {
    /// Deep Zoom level (0 = coarsest)
    pub level: u32,

    pub width: u32,
    pub height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,

    /// Downsample factor relative to native resolution
    pub downsample: u64,
}

/// Response from the slide metadata endpoint.
#[derive(Debug, Serialize)]
pub struct SlideMetadataResponse {
    pub slide_id: String,

    /// Native width in pixels
    pub width: u32,

    /// Native height in pixels
    pub height: u32,

    pub tile_size: u32,
    pub overlap: u32,
    pub level_count: u32,

    /// Levels ordered coarsest first
    pub levels: Vec<LevelMetadataResponse>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Build a JSON error response, logging by severity.
///
/// 5xx responses are logged at ERROR, everything else at DEBUG: missing
/// slides and bad coordinates are routine for a tile server.
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

/// Convert TileError to HTTP response.
///
/// Every request or slide problem is a 404, the same way a static file server
/// would answer for a tile that does not exist. Only render failures are 500.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TileError::SlideUnavailable(SlideError::SlideNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "slide_not_found")
            }
            TileError::SlideUnavailable(SlideError::SlideUnreadable { .. }) => {
                (StatusCode::NOT_FOUND, "slide_unreadable")
            }
            TileError::InvalidLevel { .. } => (StatusCode::NOT_FOUND, "invalid_level"),
            TileError::InvalidTileCoordinate { .. } => {
                (StatusCode::NOT_FOUND, "invalid_tile_coordinate")
            }
            TileError::UnsupportedFormat { .. } => (StatusCode::NOT_FOUND, "unsupported_format"),
            TileError::InvalidTilePath { .. } => (StatusCode::NOT_FOUND, "invalid_tile_path"),
            TileError::DecodeFailure { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "decode_error")
            }
            TileError::EncodeFailure { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
            }
        };

        error_response(status, error_type, self.to_string())
    }
}

/// Errors from the heatmap file endpoint.
#[derive(Debug)]
pub enum HeatmapError {
    /// No such file in the heatmap directory
    NotFound { filename: String },

    /// The file exists but could not be read
    Io { filename: String, message: String },
}

impl IntoResponse for HeatmapError {
    fn into_response(self) -> Response {
        match self {
            HeatmapError::NotFound { filename } => error_response(
                StatusCode::NOT_FOUND,
                "heatmap_not_found",
                format!("Heatmap not found: {}", filename),
            ),
            HeatmapError::Io { filename, message } => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                format!("Failed to read heatmap {}: {}", filename, message),
            ),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle DZI descriptor requests.
///
/// # Endpoint
///
/// `GET /slides/{slide_id}.dzi`
///
/// # Response
///
/// - `200 OK`: DZI XML with `Content-Type: application/xml`
/// - `404 Not Found`: Slide missing or unreadable
pub async fn dzi_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(segment): Path<String>,
) -> Result<Response, TileError> {
    let slide_id = slide_id_from_dzi(&segment).ok_or_else(|| TileError::InvalidTilePath {
        path: segment.clone(),
    })?;

    let slide = state.tile_service.slide(slide_id).await?;
    let pyramid = slide.pyramid();
    let (width, height) = pyramid.dimensions();

    let xml = generate_dzi_xml(
        width,
        height,
        pyramid.tile_size(),
        pyramid.overlap(),
        TileFormat::Jpeg,
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/xml".to_string()),
            (header::CACHE_CONTROL, state.cache_control()),
        ],
        xml,
    )
        .into_response())
}

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /slides/{slide_id}_files/{level}/{col}_{row}.{format}`
///
/// # Path Parameters
///
/// - `slide_id`: Slide file name inside the slide directory
/// - `level`: Deep Zoom level (0 = coarsest)
/// - `col`, `row`: Tile grid coordinates
/// - `format`: `jpeg` or `png`
///
/// # Response
///
/// - `200 OK`: Encoded tile
/// - `404 Not Found`: Unknown slide, bad path, unsupported format, or
///   coordinates outside the pyramid
/// - `500 Internal Server Error`: Region read or encode failed
///
/// # Headers
///
/// - `Content-Type: image/jpeg` or `image/png`
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit: true|false`
pub async fn tile_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path((files, level, tile)): Path<(String, String, String)>,
) -> Result<Response, TileError> {
    let invalid_path = || TileError::InvalidTilePath {
        path: format!("{}/{}/{}", files, level, tile),
    };

    let slide_id = slide_id_from_files(&files).ok_or_else(invalid_path)?;
    let level = parse_coordinate(&level).ok_or_else(invalid_path)?;
    let (col, row, format) = parse_tile_name(&tile).ok_or_else(invalid_path)?;

    let request = TileRequest::new(slide_id, level, col, row, format);
    let response = state.tile_service.get_tile(request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, response.format.content_type().to_string()),
            (header::CACHE_CONTROL, state.cache_control()),
            (
                HeaderName::from_static(TILE_CACHE_HIT_HEADER),
                response.cache_hit.to_string(),
            ),
        ],
        Body::from(response.data),
    )
        .into_response())
}

/// Handle slide metadata requests.
///
/// # Endpoint
///
/// `GET /slides/{slide_id}/metadata`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "slide_id": "CMU-1.svs",
///   "width": 1000,
///   "height": 800,
///   "tile_size": 254,
///   "overlap": 1,
///   "level_count": 11,
///   "levels": [
///     { "level": 0, "width": 1, "height": 1, "tiles_x": 1, "tiles_y": 1, "downsample": 1024 }
///   ]
/// }
/// ```
pub async fn metadata_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(slide_id): Path<String>,
) -> Result<Json<SlideMetadataResponse>, TileError> {
    let slide = state.tile_service.slide(&slide_id).await?;
    let pyramid = slide.pyramid();
    let (width, height) = pyramid.dimensions();

    let levels = (0..pyramid.level_count())
        .filter_map(|level| {
            let info = pyramid.level(level)?;
            Some(LevelMetadataResponse {
                level,
                width: info.width,
                height: info.height,
                tiles_x: info.tiles_x,
                tiles_y: info.tiles_y,
                downsample: pyramid.downsample(level)?,
            })
        })
        .collect();

    Ok(Json(SlideMetadataResponse {
        slide_id,
        width,
        height,
        tile_size: pyramid.tile_size(),
        overlap: pyramid.overlap(),
        level_count: pyramid.level_count(),
        levels,
    }))
}

/// Handle heatmap file requests.
///
/// # Endpoint
///
/// `GET /heatmaps/{filename}`
///
/// Files are served as-is from the heatmap directory. Only plain file names
/// are accepted; anything that looks like a path is a 404.
pub async fn heatmap_handler<S: SlideSource>(
    State(state): State<AppState<S>>,
    Path(filename): Path<String>,
) -> Result<Response, HeatmapError> {
    let not_found = || HeatmapError::NotFound {
        filename: filename.clone(),
    };

    let path = join_file_name(&state.heatmap_dir, &filename).ok_or_else(not_found)?;
    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return Err(not_found()),
    }

    let data = tokio::fs::read(&path).await.map_err(|e| HeatmapError::Io {
        filename: filename.clone(),
        message: e.to_string(),
    })?;

    Ok((
        [(header::CONTENT_TYPE, content_type_for(&filename))],
        Body::from(data),
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Guess a content type from a file extension.
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "json" => "application/json",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Tests
// =============================================================================
