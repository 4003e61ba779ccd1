//! Slide registry with caching and singleflight.
//!
//! The registry maps slide identifiers to open slide handles. It:
//! - Resolves identifiers to files through a [`SlideSource`]
//! - Opens each slide at most once at a time, even under concurrent requests
//! - Keeps opened slides and failed opens in two separate LRU caches
//!
//! Failures are cached just like successes. A missing or unreadable slide
//! keeps returning the same error until it is evicted or invalidated, so a
//! viewer hammering a broken slide never re-touches the disk.
//!
//! Opening a slide is blocking work (file I/O and decoding), so it runs on the
//! blocking thread pool. The async side only waits on a watch channel.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use lru::LruCache;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{DecoderError, SlideError};

use super::decoder::SlideHandle;
use super::pyramid::{DeepZoomPyramid, DEFAULT_OVERLAP, DEFAULT_TILE_SIZE};

/// Default number of slides kept open.
pub const DEFAULT_SLIDE_CACHE_CAPACITY: usize = 100;

// =============================================================================
// SlideSource Trait
// =============================================================================

/// Where slides come from and how they are opened.
///
/// Both methods are called from the blocking thread pool.
pub trait SlideSource: Send + Sync + 'static {
    /// Handle type for opened slides.
    type Handle: SlideHandle;

    /// Map a slide identifier to a file, or `None` if no such slide exists.
    fn resolve(&self, slide_id: &str) -> Option<PathBuf>;

    /// Open the slide file at `path`.
    fn open(&self, path: &Path) -> Result<Self::Handle, DecoderError>;
}

// =============================================================================
// CachedSlide
// =============================================================================

/// An opened slide together with its Deep Zoom pyramid.
pub struct CachedSlide<H> {
    slide_id: String,
    generation: u64,
    path: PathBuf,
    handle: H,
    pyramid: DeepZoomPyramid,
}

impl<H: SlideHandle> CachedSlide<H> {
    pub fn slide_id(&self) -> &str {
        &self.slide_id
    }

    /// Registry-unique number of this open.
    ///
    /// A slide that is evicted and opened again gets a new generation, so
    /// anything derived from the old handle can be told apart.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// File the slide was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn pyramid(&self) -> &DeepZoomPyramid {
        &self.pyramid
    }

    /// Native dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pyramid.dimensions()
    }
}

impl<H> std::fmt::Debug for CachedSlide<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSlide")
            .field("slide_id", &self.slide_id)
            .field("generation", &self.generation)
            .field("path", &self.path)
            .field("pyramid", &self.pyramid)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SlideRegistry
// =============================================================================

type SlideResult<H> = Result<Arc<CachedSlide<H>>, SlideError>;
type Entries<H> = Arc<Mutex<LruCache<String, Arc<CachedSlide<H>>>>>;
type Failures = Arc<Mutex<LruCache<String, SlideError>>>;
type InFlight<H> = Arc<Mutex<HashMap<String, watch::Receiver<Option<SlideResult<H>>>>>>;

/// Registry for managing slide lifecycle and caching.
///
/// Opened slides and failed lookups live in separate LRUs of the same
/// capacity, so requests for unknown slides never push open slides out.
///
/// Lock order is `in_flight` before `entries` before `failures`. No lock is
/// held across an await point or while a slide is being opened.
pub struct SlideRegistry<S: SlideSource> {
    /// Resolves and opens slides
    source: Arc<S>,

    /// Opened slides, keyed by slide ID
    entries: Entries<S::Handle>,

    /// Missing and unreadable slides, keyed by slide ID
    failures: Failures,

    /// Opens currently running on the blocking pool
    in_flight: InFlight<S::Handle>,

    /// Source of `CachedSlide::generation`
    next_generation: Arc<AtomicU64>,

    /// Tile edge length used for every pyramid
    tile_size: u32,

    /// Tile overlap used for every pyramid
    overlap: u32,
}

impl<S: SlideSource> SlideRegistry<S> {
    /// Create a registry with the default capacity and tiling.
    pub fn new(source: S) -> Self {
        Self::with_capacity(
            source,
            DEFAULT_SLIDE_CACHE_CAPACITY,
            DEFAULT_TILE_SIZE,
            DEFAULT_OVERLAP,
        )
    }

    /// Create a registry with custom settings.
    ///
    /// # Arguments
    /// * `source` - Resolves and opens slides
    /// * `capacity` - Maximum number of open slides, and separately of cached
    ///   failures (minimum 1)
    /// * `tile_size` - Deep Zoom tile edge length
    /// * `overlap` - Deep Zoom tile overlap
    pub fn with_capacity(source: S, capacity: usize, tile_size: u32, overlap: u32) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source: Arc::new(source),
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            failures: Arc::new(Mutex::new(LruCache::new(capacity))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(AtomicU64::new(0)),
            tile_size,
            overlap,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    /// Get a slide, opening it if it is not cached.
    ///
    /// Concurrent callers asking for the same uncached slide share one open.
    /// Callers asking for different slides never wait on each other.
    pub async fn get_slide(&self, slide_id: &str) -> SlideResult<S::Handle> {
        // Fast path: check cache
        if let Some(result) = self.cached(slide_id) {
            return result;
        }

        let mut rx = {
            let mut in_flight = lock(&self.in_flight);

            // The previous leader may have finished between the two locks
            if let Some(result) = self.cached(slide_id) {
                return result;
            }

            let rx = match in_flight.get(slide_id).cloned() {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    in_flight.insert(slide_id.to_string(), rx.clone());
                    self.spawn_open(slide_id.to_string(), tx);
                    rx
                }
            };
            rx
        };

        let outcome = match rx.wait_for(|value| value.is_some()).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };

        outcome.unwrap_or_else(|| {
            Err(SlideError::SlideUnreadable {
                slide_id: slide_id.to_string(),
                reason: "slide open was aborted".to_string(),
            })
        })
    }

    /// Look up a settled result, marking it as recently used.
    fn cached(&self, slide_id: &str) -> Option<SlideResult<S::Handle>> {
        if let Some(slide) = lock(&self.entries).get(slide_id) {
            return Some(Ok(Arc::clone(slide)));
        }
        lock(&self.failures).get(slide_id).cloned().map(Err)
    }

    /// Run the open for `slide_id` on the blocking pool and publish the result.
    fn spawn_open(&self, slide_id: String, tx: watch::Sender<Option<SlideResult<S::Handle>>>) {
        let source = Arc::clone(&self.source);
        let entries = Arc::clone(&self.entries);
        let failures = Arc::clone(&self.failures);
        let next_generation = Arc::clone(&self.next_generation);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            slide_id: slide_id.clone(),
        };
        let (tile_size, overlap) = (self.tile_size, self.overlap);

        tokio::task::spawn_blocking(move || {
            let generation = next_generation.fetch_add(1, Ordering::Relaxed);
            let result = open_slide(source.as_ref(), &slide_id, generation, tile_size, overlap);

            match &result {
                Ok(slide) => {
                    let evicted = lock(&entries).push(slide_id.clone(), Arc::clone(slide));
                    if let Some((evicted_id, _)) = evicted.filter(|(id, _)| *id != slide_id) {
                        debug!(slide_id = %evicted_id, "Evicted slide from cache");
                    }
                }
                Err(e) => {
                    let _ = lock(&failures).push(slide_id.clone(), e.clone());
                }
            }

            // Waiters that arrive from now on hit the cache instead
            drop(guard);
            let _ = tx.send(Some(result));
        });
    }

    /// Remove one slide from the cache, successful or not.
    ///
    /// The next request re-resolves and re-opens it.
    pub fn invalidate(&self, slide_id: &str) {
        let opened = lock(&self.entries).pop(slide_id).is_some();
        let failed = lock(&self.failures).pop(slide_id).is_some();
        if opened || failed {
            debug!(slide_id = %slide_id, "Invalidated slide");
        }
    }

    /// Drop every cached slide and failure, releasing the handles.
    pub fn clear(&self) {
        let mut entries = lock(&self.entries);
        let count = entries.len();
        entries.clear();
        drop(entries);

        let mut failures = lock(&self.failures);
        let failed = failures.len();
        failures.clear();
        debug!(count, failed, "Cleared slide cache");
    }

    /// Number of cached entries, failures included.
    pub fn cached_count(&self) -> usize {
        self.opened_count() + lock(&self.failures).len()
    }

    /// Number of slides currently held open.
    pub fn opened_count(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// Removes the in-flight marker when the open finishes or unwinds.
struct InFlightGuard<H> {
    in_flight: InFlight<H>,
    slide_id: String,
}

impl<H> Drop for InFlightGuard<H> {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.slide_id);
    }
}

/// Resolve, open and measure one slide.
fn open_slide<S: SlideSource>(
    source: &S,
    slide_id: &str,
    generation: u64,
    tile_size: u32,
    overlap: u32,
) -> SlideResult<S::Handle> {
    let started = Instant::now();

    let Some(path) = source.resolve(slide_id) else {
        debug!(slide_id = %slide_id, "Slide not found");
        return Err(SlideError::SlideNotFound {
            slide_id: slide_id.to_string(),
        });
    };

    let unreadable = |reason: String| {
        warn!(slide_id = %slide_id, path = %path.display(), reason = %reason, "Failed to open slide");
        SlideError::SlideUnreadable {
            slide_id: slide_id.to_string(),
            reason,
        }
    };

    let handle = match catch_unwind(AssertUnwindSafe(|| source.open(&path))) {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => return Err(unreadable(e.to_string())),
        Err(_) => return Err(unreadable("decoder panicked".to_string())),
    };

    let (width, height) = handle.native_size();
    let pyramid = DeepZoomPyramid::build(width, height, tile_size, overlap)
        .map_err(|e| unreadable(e.to_string()))?;

    info!(
        slide_id = %slide_id,
        width,
        height,
        levels = pyramid.level_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Opened slide"
    );

    Ok(Arc::new(CachedSlide {
        slide_id: slide_id.to_string(),
        generation,
        path,
        handle,
        pyramid,
    }))
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// Tests
// =============================================================================
