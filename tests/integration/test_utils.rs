//! Test utilities for integration tests.
//!
//! Fixtures are real image files written into temporary directories and read
//! back through the same decoder the server uses.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use wsi_deepzoom::error::DecoderError;
use wsi_deepzoom::slide::{LocalSlideSource, RasterDecoder, RasterHandle, SlideRegistry, SlideSource};
use wsi_deepzoom::tile::TileService;
use wsi_deepzoom::{create_router, RouterConfig};

/// Identifier of the default 1000x800 fixture slide.
pub const SLIDE_ID: &str = "sample.png";

pub const SLIDE_WIDTH: u32 = 1000;
pub const SLIDE_HEIGHT: u32 = 800;

// =============================================================================
// Fixtures
// =============================================================================

/// Deterministic gradient so that every region has distinct pixels.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Write a gradient PNG named `name` into `dir`.
pub fn write_slide(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    gradient_image(width, height)
        .save(&path)
        .expect("failed to write fixture slide");
    path
}

/// Temporary slide and heatmap directories with the default fixture slide.
pub struct Fixture {
    pub slides: TempDir,
    pub heatmaps: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let slides = TempDir::new().expect("failed to create slide dir");
        let heatmaps = TempDir::new().expect("failed to create heatmap dir");
        write_slide(slides.path(), SLIDE_ID, SLIDE_WIDTH, SLIDE_HEIGHT);
        Self { slides, heatmaps }
    }

    pub fn slide_dir(&self) -> &Path {
        self.slides.path()
    }

    pub fn heatmap_dir(&self) -> &Path {
        self.heatmaps.path()
    }

    /// Source reading from the fixture's slide directory, counting opens.
    pub fn source(&self) -> CountingSource {
        CountingSource::new(self.slide_dir())
    }

    /// Router over the fixture directories with default settings.
    pub fn router(&self) -> Router {
        self.router_with_source(self.source())
    }

    pub fn router_with_source(&self, source: CountingSource) -> Router {
        let service = TileService::new(SlideRegistry::new(source));
        create_router(service, self.router_config())
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig::new()
            .with_heatmap_dir(self.heatmap_dir())
            .with_tracing(false)
    }
}

// =============================================================================
// Counting Source
// =============================================================================

/// A [`LocalSlideSource`] that counts resolve and open calls.
///
/// Clones share their counters, so a test can keep one copy while the
/// registry owns another.
#[derive(Clone)]
pub struct CountingSource {
    inner: Arc<LocalSlideSource<RasterDecoder>>,
    resolves: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: Arc::new(LocalSlideSource::new(root, RasterDecoder::new())),
            resolves: Arc::new(AtomicUsize::new(0)),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl SlideSource for CountingSource {
    type Handle = RasterHandle;

    fn resolve(&self, slide_id: &str) -> Option<PathBuf> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(slide_id)
    }

    fn open(&self, path: &Path) -> Result<RasterHandle, DecoderError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(path)
    }
}

// =============================================================================
// HTTP Helpers
// =============================================================================

/// Send a GET request through the router.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("invalid request");
    router.clone().oneshot(request).await.expect("router error")
}

/// Send a GET request and collect status, headers and body.
pub async fn get_bytes(router: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
    let response = get(router, uri).await;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    (status, headers, body)
}

/// Send a GET request and parse the body as JSON.
pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = get_bytes(router, uri).await;
    let value = serde_json::from_slice(&body).expect("body is not JSON");
    (status, value)
}

/// Decode an encoded tile and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(data).expect("tile is not a decodable image");
    (image.width(), image.height())
}

pub fn is_valid_jpeg(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == [0xFF, 0xD8] && data[data.len() - 2..] == [0xFF, 0xD9]
}

pub fn is_valid_png(data: &[u8]) -> bool {
    data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
}
