//! Slide abstraction layer.
//!
//! Everything needed to go from a slide identifier to pixels:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            SlideRegistry                │
//! │ (LRU of open slides, singleflight open) │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      SlideSource (LocalSlideSource)     │
//! │   (slide ID -> file, file -> handle)    │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │     SlideDecoder / SlideHandle          │
//! │   (RasterDecoder for JPEG/PNG/TIFF)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Each opened slide carries a [`DeepZoomPyramid`] computed once from its
//! native dimensions.

mod decoder;
mod local_source;
mod pyramid;
mod registry;

pub use decoder::{RasterDecoder, RasterHandle, SlideDecoder, SlideHandle};
pub use local_source::{join_file_name, resolve_in_directory, LocalSlideSource};
pub use pyramid::{
    DeepZoomPyramid, LevelInfo, NativeRegion, TileAddress, TileGeometry, DEFAULT_OVERLAP,
    DEFAULT_TILE_SIZE,
};
pub use registry::{CachedSlide, SlideRegistry, SlideSource, DEFAULT_SLIDE_CACHE_CAPACITY};
