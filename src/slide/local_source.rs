//! Filesystem-backed slide source.
//!
//! Slides live as flat files in a single directory. The slide identifier is
//! the file name, so `GET /slides/CMU-1.svs.dzi` maps to `<root>/CMU-1.svs`.

use std::path::{Path, PathBuf};

use crate::error::DecoderError;

use super::decoder::SlideDecoder;
use super::SlideSource;

/// Slide source that resolves identifiers to files under a root directory.
///
/// # Example
///
/// ```ignore
/// use wsi_deepzoom::slide::{LocalSlideSource, RasterDecoder, SlideSource};
///
/// let source = LocalSlideSource::new("slides", RasterDecoder::new());
/// let path = source.resolve("CMU-1.svs").expect("slide exists");
/// let handle = source.open(&path)?;
/// ```
#[derive(Debug, Clone)]
pub struct LocalSlideSource<D> {
    root: PathBuf,
    decoder: D,
}

impl<D: SlideDecoder> LocalSlideSource<D> {
    pub fn new(root: impl Into<PathBuf>, decoder: D) -> Self {
        Self {
            root: root.into(),
            decoder,
        }
    }

    /// Directory slides are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl<D: SlideDecoder> SlideSource for LocalSlideSource<D> {
    type Handle = D::Handle;

    fn resolve(&self, slide_id: &str) -> Option<PathBuf> {
        resolve_in_directory(&self.root, slide_id)
    }

    fn open(&self, path: &Path) -> Result<Self::Handle, DecoderError> {
        self.decoder.open(path)
    }
}

/// Resolve a bare file name inside `root`.
///
/// Returns `None` unless `name` is a single path component naming an existing
/// regular file. Separators, `.` and `..` are rejected so a request can never
/// reach outside `root`.
///
/// This touches the filesystem; async callers should use [`join_file_name`]
/// and check the file with `tokio::fs`.
pub fn resolve_in_directory(root: &Path, name: &str) -> Option<PathBuf> {
    join_file_name(root, name).filter(|path| path.is_file())
}

/// Join `name` onto `root` if it is a single plain path component.
///
/// Pure string check; does not look at the filesystem.
pub fn join_file_name(root: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return None;
    }
    Some(root.join(name))
}
