//! DZI descriptor tests.
//!
//! The descriptor is what a viewer fetches first; its numbers must agree with
//! the tiles served under `{slide}_files/`.

use axum::http::StatusCode;

use wsi_deepzoom::slide::SlideRegistry;
use wsi_deepzoom::tile::TileService;
use wsi_deepzoom::create_router;

use super::test_utils::{get_bytes, image_dimensions, write_slide, Fixture, SLIDE_ID};

#[tokio::test]
async fn test_dzi_descriptor() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, headers, body) = get_bytes(&router, &format!("/slides/{}.dzi", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/xml");
    assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=3600");

    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains(r#"xmlns="http://schemas.microsoft.com/deepzoom/2008""#));
    assert!(xml.contains(r#"Format="jpeg""#));
    assert!(xml.contains(r#"Overlap="1""#));
    assert!(xml.contains(r#"TileSize="254""#));
    assert!(xml.contains(r#"<Size Width="1000" Height="800"/>"#));
}

#[tokio::test]
async fn test_dzi_uses_configured_tiling() {
    let fixture = Fixture::new();
    let registry = SlideRegistry::with_capacity(fixture.source(), 10, 512, 2);
    let router = create_router(TileService::new(registry), fixture.router_config());

    let (status, _, body) = get_bytes(&router, &format!("/slides/{}.dzi", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);

    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains(r#"Overlap="2""#));
    assert!(xml.contains(r#"TileSize="512""#));

    // 1000x800 with 512px tiles: 2x2 grid, the first tile carries right and
    // bottom overlap
    let (status, _, body) =
        get_bytes(&router, &format!("/slides/{}_files/10/0_0.png", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(&body), (514, 514));

    let (status, _, body) =
        get_bytes(&router, &format!("/slides/{}_files/10/1_1.png", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(&body), (1000 - 512 + 2, 800 - 512 + 2));
}

#[tokio::test]
async fn test_dzi_size_matches_each_slide() {
    let fixture = Fixture::new();
    write_slide(fixture.slide_dir(), "small.png", 37, 5);
    let router = fixture.router();

    let (status, _, body) = get_bytes(&router, "/slides/small.png.dzi").await;
    assert_eq!(status, StatusCode::OK);
    let xml = String::from_utf8(body.to_vec()).unwrap();
    assert!(xml.contains(r#"<Size Width="37" Height="5"/>"#));

    // Smaller than one tile: the native level is a single unpadded tile
    let (status, _, body) = get_bytes(&router, "/slides/small.png_files/6/0_0.png").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(image_dimensions(&body), (37, 5));
}

#[tokio::test]
async fn test_dzi_without_suffix_is_not_a_descriptor() {
    let fixture = Fixture::new();
    let router = fixture.router();

    let (status, _, _) = get_bytes(&router, &format!("/slides/{}", SLIDE_ID)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = get_bytes(&router, "/slides/.dzi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
