//! WSI Deep Zoom - A Deep Zoom tile server for Whole Slide Images.
//!
//! This binary starts the HTTP server and configures all components.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsi_deepzoom::{
    config::Config,
    server::{create_router, RouterConfig},
    slide::{LocalSlideSource, RasterDecoder, SlideRegistry},
    tile::{TileCache, TileEncoder, TileService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Slide directory: {}", config.slide_dir.display());
    info!("  Heatmap directory: {}", config.heatmap_dir.display());
    info!(
        "  Deep Zoom: tile size {}, overlap {}, JPEG quality {}",
        config.tile_size, config.overlap, config.jpeg_quality
    );
    info!(
        "  Cache: {} slides, {}MB tiles",
        config.cache_slides,
        config.cache_tiles / (1024 * 1024)
    );

    for dir in [&config.slide_dir, &config.heatmap_dir] {
        if let Err(e) = ensure_directory(dir).await {
            error!("Failed to create directory {}: {}", dir.display(), e);
            return ExitCode::FAILURE;
        }
    }

    let source = LocalSlideSource::new(config.slide_dir.clone(), RasterDecoder::new());
    let registry = Arc::new(SlideRegistry::with_capacity(
        source,
        config.cache_slides,
        config.tile_size,
        config.overlap,
    ));

    let tile_service = TileService::with_shared_registry(Arc::clone(&registry))
        .with_cache(TileCache::with_capacity(config.cache_tiles))
        .with_encoder(TileEncoder::new(config.jpeg_quality));

    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/slides/<slide_id>.dzi", addr);
    info!("    curl http://{}/slides/<slide_id>/metadata", addr);
    info!("");
    info!("  Fetch a tile directly:");
    info!("    curl http://{}/slides/<slide_id>_files/0/0_0.jpeg", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let released = registry.cached_count();
    registry.clear();
    info!(released, "Released cached slides");

    if let Err(e) = result {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██████╗ ███████╗███████╗██████╗     ███████╗ ██████╗  ██████╗ ███╗   ███╗");
    info!("██╔══██╗██╔════╝██╔════╝██╔══██╗    ╚══███╔╝██╔═══██╗██╔═══██╗████╗ ████║");
    info!("██║  ██║█████╗  █████╗  ██████╔╝      ███╔╝ ██║   ██║██║   ██║██╔████╔██║");
    info!("██║  ██║██╔══╝  ██╔══╝  ██╔═══╝      ███╔╝  ██║   ██║██║   ██║██║╚██╔╝██║");
    info!("██████╔╝███████╗███████╗██║         ███████╗╚██████╔╝╚██████╔╝██║ ╚═╝ ██║");
    info!("╚═════╝ ╚══════╝╚══════╝╚═╝         ╚══════╝ ╚═════╝  ╚═════╝ ╚═╝     ╚═╝");
    info!("");
    info!("                        wsi-deepzoom v{}", version);
}

/// Create `dir` if it does not exist yet.
async fn ensure_directory(dir: &Path) -> std::io::Result<()> {
    if tokio::fs::try_exists(dir).await? {
        return Ok(());
    }
    warn!("Directory {} does not exist, creating it", dir.display());
    tokio::fs::create_dir_all(dir).await
}

/// Resolve once Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "wsi_deepzoom=debug,tower_http=debug"
    } else {
        "wsi_deepzoom=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_heatmap_dir(config.heatmap_dir.clone())
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
