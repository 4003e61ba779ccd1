//! Cache for encoded tiles.
//!
//! Rendering a tile means a region read, a resize and an encode. Viewers ask
//! for the same tiles over and over while panning, so encoded results are kept
//! in a byte-bounded LRU.
//!
//! # Cache Key
//!
//! Tiles are cached by a composite key:
//! - Slide identifier
//! - Slide generation (changes every time the registry re-opens the slide)
//! - Deep Zoom level
//! - Column and row
//! - Output format
//!
//! Only successfully encoded tiles are stored. Errors always go back to the
//! slide registry, which has its own failure cache.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use super::encoder::TileFormat;

/// Default cache capacity: 100MB
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 100 * 1024 * 1024;

/// Upper bound on entry count, to bound LRU bookkeeping
const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for encoded tiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    pub slide_id: Arc<str>,
    /// [`crate::slide::CachedSlide::generation`] the tile was rendered from
    pub generation: u64,
    pub level: u32,
    pub col: u32,
    pub row: u32,
    pub format: TileFormat,
}

impl TileCacheKey {
    pub fn new(
        slide_id: impl Into<Arc<str>>,
        generation: u64,
        level: u32,
        col: u32,
        row: u32,
        format: TileFormat,
    ) -> Self {
        Self {
            slide_id: slide_id.into(),
            generation,
            level,
            col,
            row,
            format,
        }
    }
}

// =============================================================================
// Tile Cache
// =============================================================================

struct Inner {
    entries: LruCache<TileCacheKey, Bytes>,
    size: usize,
}

impl Inner {
    fn remove(&mut self, key: &TileCacheKey) -> Option<Bytes> {
        let data = self.entries.pop(key)?;
        self.size -= data.len();
        Some(data)
    }
}

/// LRU cache for encoded tiles with a byte budget.
///
/// Entries are evicted least-recently-used first once either the byte budget
/// or the entry limit is exceeded. A single tile larger than the whole budget
/// is never stored.
pub struct TileCache {
    inner: Mutex<Inner>,
    max_size: usize,
}

impl TileCache {
    /// Create a cache with the default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_size` bytes of tile data.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with both a byte budget and an entry limit.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(max_entries),
                size: 0,
            }),
            max_size,
        }
    }

    /// Get a tile, marking it as recently used.
    pub async fn get(&self, key: &TileCacheKey) -> Option<Bytes> {
        self.inner.lock().await.entries.get(key).cloned()
    }

    /// Check for a tile without updating LRU order.
    pub async fn contains(&self, key: &TileCacheKey) -> bool {
        self.inner.lock().await.entries.contains(key)
    }

    /// Store a tile, evicting older tiles until the cache fits its budget.
    pub async fn put(&self, key: TileCacheKey, data: Bytes) {
        if data.len() > self.max_size {
            return;
        }

        let mut inner = self.inner.lock().await;
        inner.remove(&key);

        let data_size = data.len();
        if let Some((_, evicted)) = inner.entries.push(key, data) {
            inner.size -= evicted.len();
        }
        inner.size += data_size;

        while inner.size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.size -= evicted.len(),
                None => break,
            }
        }
    }

    /// Remove one tile, returning its data if it was cached.
    pub async fn remove(&self, key: &TileCacheKey) -> Option<Bytes> {
        self.inner.lock().await.remove(key)
    }

    /// Remove every tile of one slide. Returns the number of tiles removed.
    pub async fn remove_slide(&self, slide_id: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let keys: Vec<TileCacheKey> = inner
            .entries
            .iter()
            .filter(|(key, _)| &*key.slide_id == slide_id)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            inner.remove(key);
        }
        keys.len()
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.size = 0;
    }

    /// Number of cached tiles.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Total size of cached tiles in bytes.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.size
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
