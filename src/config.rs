//! Configuration management.
//!
//! Settings come from command-line arguments via clap, with environment
//! variable fallbacks (`WSI_` prefix) and defaults for everything.
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use wsi_deepzoom::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//! println!("Serving {} on {}", config.slide_dir.display(), config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `WSI_HOST` - Server bind address (default: 0.0.0.0)
//! - `WSI_PORT` - Server port (default: 5000)
//! - `WSI_SLIDE_DIR` - Directory containing slide files (default: slides)
//! - `WSI_HEATMAP_DIR` - Directory containing heatmap files (default: heatmaps)
//! - `WSI_TILE_SIZE` - Deep Zoom tile size (default: 254)
//! - `WSI_OVERLAP` - Deep Zoom tile overlap (default: 1)
//! - `WSI_JPEG_QUALITY` - JPEG quality for tiles (default: 80)
//! - `WSI_CACHE_SLIDES` - Max slides to keep open (default: 100)
//! - `WSI_CACHE_TILES` - Max bytes of encoded tiles to cache (default: 100MB)
//! - `WSI_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 3600)
//! - `WSI_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;

use clap::Parser;

use crate::slide::{DEFAULT_OVERLAP, DEFAULT_SLIDE_CACHE_CAPACITY, DEFAULT_TILE_SIZE};
use crate::tile::{is_valid_quality, DEFAULT_JPEG_QUALITY, DEFAULT_TILE_CACHE_CAPACITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default slide directory.
pub const DEFAULT_SLIDE_DIR: &str = "slides";

/// Default heatmap directory.
pub const DEFAULT_HEATMAP_DIR: &str = "heatmaps";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// WSI Deep Zoom - A Deep Zoom tile server for Whole Slide Images.
///
/// Serves slides from a local directory as Deep Zoom pyramids that any
/// OpenSeadragon-style viewer can display.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-deepzoom")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "WSI_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "WSI_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory containing slide files.
    ///
    /// Slide identifiers in URLs are file names inside this directory.
    #[arg(long, default_value = DEFAULT_SLIDE_DIR, env = "WSI_SLIDE_DIR")]
    pub slide_dir: PathBuf,

    /// Directory containing pre-generated heatmap files.
    #[arg(long, default_value = DEFAULT_HEATMAP_DIR, env = "WSI_HEATMAP_DIR")]
    pub heatmap_dir: PathBuf,

    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Deep Zoom tile edge length in pixels, excluding overlap.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "WSI_TILE_SIZE")]
    pub tile_size: u32,

    /// Overlap in pixels added to each interior tile edge.
    #[arg(long, default_value_t = DEFAULT_OVERLAP, env = "WSI_OVERLAP")]
    pub overlap: u32,

    /// JPEG quality for tile encoding (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "WSI_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Maximum number of slides to keep open.
    #[arg(long, default_value_t = DEFAULT_SLIDE_CACHE_CAPACITY, env = "WSI_CACHE_SLIDES")]
    pub cache_slides: usize,

    /// Maximum total size of cached encoded tiles in bytes.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "WSI_CACHE_TILES")]
    pub cache_tiles: usize,

    /// HTTP Cache-Control max-age in seconds.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "WSI_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "WSI_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.overlap >= self.tile_size {
            return Err(format!(
                "overlap ({}) must be smaller than tile_size ({})",
                self.overlap, self.tile_size
            ));
        }

        if !is_valid_quality(self.jpeg_quality) {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if self.cache_slides == 0 {
            return Err("cache_slides must be greater than 0".to_string());
        }
        if self.cache_tiles == 0 {
            return Err("cache_tiles must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
