//! API integration tests for tile retrieval and error handling.
//!
//! Tests verify:
//! - JPEG and PNG tile retrieval with the expected pixel dimensions
//! - Error cases (missing slide, invalid coordinates, unsupported format)
//! - Metadata, heatmap and health endpoints
//! - HTTP response codes and headers

use axum::http::StatusCode;

use super::test_utils::{
    get_bytes, get_json, image_dimensions, is_valid_jpeg, is_valid_png, write_slide, Fixture,
    SLIDE_HEIGHT, SLIDE_ID, SLIDE_WIDTH,
};

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_jpeg_tile_retrieval() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, headers, body) =
        get_bytes(&router, &format!("/slides/{}_files/10/0_0.jpeg", SLIDE_ID)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/jpeg");
    assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=3600");
    assert!(is_valid_jpeg(&body));

    // Top-left tile: content plus right and bottom overlap
    assert_eq!(image_dimensions(&body), (255, 255));
}

#[tokio::test]
async fn test_png_tile_retrieval() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, headers, body) =
        get_bytes(&router, &format!("/slides/{}_files/10/1_1.png", SLIDE_ID)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
    assert!(is_valid_png(&body));

    // Interior tile: overlap on all four sides
    assert_eq!(image_dimensions(&body), (256, 256));
}

#[tokio::test]
async fn test_png_tile_pixels_match_source() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, _, body) =
        get_bytes(&router, &format!("/slides/{}_files/10/1_0.png", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);

    let tile = image::load_from_memory(&body).unwrap().to_rgb8();
    let source = super::test_utils::gradient_image(SLIDE_WIDTH, SLIDE_HEIGHT);

    // Column 1 starts one overlap pixel left of x = 254
    assert_eq!(tile.get_pixel(0, 0), source.get_pixel(253, 0));
    assert_eq!(tile.get_pixel(10, 20), source.get_pixel(263, 20));
}

#[tokio::test]
async fn test_edge_tiles_are_clipped() {
    let fixture = Fixture::new();
    let router = fixture.router();

    // Native level is 1000x800 with a 4x4 grid. The last column holds
    // 1000 - 3 * 254 = 238 pixels, the last row 800 - 3 * 254 = 38.
    let (status, _, body) =
        get_bytes(&router, &format!("/slides/{}_files/10/3_3.png", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(&body), (239, 39));

    let (_, _, body) = get_bytes(&router, &format!("/slides/{}_files/10/3_0.png", SLIDE_ID)).await;
    assert_eq!(image_dimensions(&body), (239, 255));
}

#[tokio::test]
async fn test_downsampled_level_tiles() {
    let fixture = Fixture::new();
    let router = fixture.router();

    // Level 9 is 500x400 with a 2x2 grid
    let (status, _, body) =
        get_bytes(&router, &format!("/slides/{}_files/9/1_1.png", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(&body), (247, 147));

    // Level 0 is a single pixel
    let (status, _, body) =
        get_bytes(&router, &format!("/slides/{}_files/0/0_0.png", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(&body), (1, 1));
}

#[tokio::test]
async fn test_same_tile_is_deterministic() {
    let fixture = Fixture::new();

    let uri = format!("/slides/{}_files/8/0_0.png", SLIDE_ID);
    let (_, _, first) = get_bytes(&fixture.router(), &uri).await;
    let (_, _, second) = get_bytes(&fixture.router(), &uri).await;

    let first = image::load_from_memory(&first).unwrap().to_rgb8();
    let second = image::load_from_memory(&second).unwrap().to_rgb8();
    assert_eq!(first.as_raw(), second.as_raw());
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_missing_slide_returns_404() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, json) = get_json(&router, "/slides/missing.png_files/0/0_0.jpeg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "slide_not_found");
    assert_eq!(json["status"], 404);

    let (status, json) = get_json(&router, "/slides/missing.png.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "slide_not_found");
}

#[tokio::test]
async fn test_unreadable_slide_returns_404() {
    let fixture = Fixture::new();
    std::fs::write(fixture.slide_dir().join("broken.png"), b"not an image").unwrap();
    let router = fixture.router();

    let (status, json) = get_json(&router, "/slides/broken.png.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "slide_unreadable");

    let (status, _) = get_json(&router, "/slides/broken.png_files/0/0_0.jpeg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_format_returns_404() {
    let fixture = Fixture::new();
    let router = fixture.router();

    for ext in ["gif", "jpg", "webp", "JPEG"] {
        let (status, json) =
            get_json(&router, &format!("/slides/{}_files/10/0_0.{}", SLIDE_ID, ext)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "format {}", ext);
        assert_eq!(json["error"], "unsupported_format");
    }
}

#[tokio::test]
async fn test_invalid_level_returns_404() {
    let fixture = Fixture::new();
    let router = fixture.router();

    for level in ["11", "-1", "99"] {
        let (status, json) = get_json(
            &router,
            &format!("/slides/{}_files/{}/0_0.jpeg", SLIDE_ID, level),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "level {}", level);
        assert_eq!(json["error"], "invalid_level");
    }
}

#[tokio::test]
async fn test_invalid_tile_coordinate_returns_404() {
    let fixture = Fixture::new();
    let router = fixture.router();

    for tile in ["4_0", "0_4", "-1_0", "0_-1"] {
        let (status, json) = get_json(
            &router,
            &format!("/slides/{}_files/10/{}.jpeg", SLIDE_ID, tile),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "tile {}", tile);
        assert_eq!(json["error"], "invalid_tile_coordinate");
    }

    // Coarse levels have fewer tiles
    let (status, _) = get_json(&router, &format!("/slides/{}_files/0/1_0.jpeg", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_tile_path_returns_404() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let malformed = [
        format!("/slides/{}/10/0_0.jpeg", SLIDE_ID),
        format!("/slides/{}_files/ten/0_0.jpeg", SLIDE_ID),
        format!("/slides/{}_files/10/0-0.jpeg", SLIDE_ID),
        format!("/slides/{}_files/10/0_0", SLIDE_ID),
        format!("/slides/{}_files/10/a_b.jpeg", SLIDE_ID),
        "/slides/_files/10/0_0.jpeg".to_string(),
        format!("/slides/{}_files/10/+1_0.jpeg", SLIDE_ID),
        format!("/slides/{}_files/10/1_+0.jpeg", SLIDE_ID),
        format!("/slides/{}_files/+10/0_0.jpeg", SLIDE_ID),
    ];

    for uri in &malformed {
        let (status, json) = get_json(&router, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "uri {}", uri);
        assert_eq!(json["error"], "invalid_tile_path");
    }
}

#[tokio::test]
async fn test_path_traversal_is_not_found() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, _, _) = get_bytes(&router, "/slides/%2E%2E.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get_bytes(&router, "/slides/..%2Fsample.png.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Metadata
// =============================================================================

#[tokio::test]
async fn test_slide_metadata() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, json) = get_json(&router, &format!("/slides/{}/metadata", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(json["slide_id"], SLIDE_ID);
    assert_eq!(json["width"], SLIDE_WIDTH);
    assert_eq!(json["height"], SLIDE_HEIGHT);
    assert_eq!(json["tile_size"], 254);
    assert_eq!(json["overlap"], 1);
    assert_eq!(json["level_count"], 11);

    let levels = json["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 11);

    assert_eq!(levels[0]["width"], 1);
    assert_eq!(levels[0]["height"], 1);
    assert_eq!(levels[0]["downsample"], 1024);

    assert_eq!(levels[10]["width"], 1000);
    assert_eq!(levels[10]["height"], 800);
    assert_eq!(levels[10]["tiles_x"], 4);
    assert_eq!(levels[10]["tiles_y"], 4);
    assert_eq!(levels[10]["downsample"], 1);
}

#[tokio::test]
async fn test_metadata_for_missing_slide() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, json) = get_json(&router, "/slides/missing.png/metadata").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "slide_not_found");
}

#[tokio::test]
async fn test_non_square_slide_metadata() {
    let fixture = Fixture::new();
    write_slide(fixture.slide_dir(), "tall.png", 300, 1200);
    let router = fixture.router();

    let (status, json) = get_json(&router, "/slides/tall.png/metadata").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["level_count"], 12);
    assert_eq!(json["levels"][11]["tiles_x"], 2);
    assert_eq!(json["levels"][11]["tiles_y"], 5);
}

// =============================================================================
// Heatmaps
// =============================================================================

#[tokio::test]
async fn test_heatmap_served_from_directory() {
    let fixture = Fixture::new();
    std::fs::write(fixture.heatmap_dir().join("scores.json"), br#"{"max":1}"#).unwrap();
    let router = fixture.router();

    let (status, headers, body) = get_bytes(&router, "/heatmaps/scores.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    assert_eq!(&body[..], br#"{"max":1}"#);
}

#[tokio::test]
async fn test_heatmap_missing_or_outside_directory() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, json) = get_json(&router, "/heatmaps/none.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "heatmap_not_found");

    let (status, _, _) = get_bytes(&router, "/heatmaps/..%2Fsecret.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_heatmap_directory_is_not_served() {
    let fixture = Fixture::new();
    std::fs::create_dir(fixture.heatmap_dir().join("nested.png")).unwrap();
    let router = fixture.router();

    let (status, json) = get_json(&router, "/heatmaps/nested.png").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "heatmap_not_found");
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, json) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, _, _) = get_bytes(&router, "/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
