//! Deep Zoom Image (DZI) protocol helpers.
//!
//! A Deep Zoom viewer needs two kinds of resources per slide:
//!
//! - `{slide}.dzi`: an XML descriptor with native size, tile size and overlap
//! - `{slide}_files/{level}/{col}_{row}.{format}`: the tiles themselves
//!
//! This module renders the descriptor and takes the URL segments apart. All
//! pyramid arithmetic lives in [`crate::slide::DeepZoomPyramid`].

use crate::tile::TileFormat;

/// XML namespace of the Deep Zoom 2008 schema.
pub const DZI_NAMESPACE: &str = "http://schemas.microsoft.com/deepzoom/2008";

/// Generate the DZI XML descriptor for a slide.
///
/// # Example Output
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
///        Format="jpeg"
///        Overlap="1"
///        TileSize="254">
///   <Size Width="46920" Height="33600"/>
/// </Image>
/// ```
pub fn generate_dzi_xml(
    width: u32,
    height: u32,
    tile_size: u32,
    overlap: u32,
    format: TileFormat,
) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="{DZI_NAMESPACE}"
       Format="{format}"
       Overlap="{overlap}"
       TileSize="{tile_size}">
  <Size Width="{width}" Height="{height}"/>
</Image>
"#
    )
}

/// Extract the slide identifier from a `{slide}.dzi` path segment.
pub fn slide_id_from_dzi(segment: &str) -> Option<&str> {
    segment.strip_suffix(".dzi").filter(|id| !id.is_empty())
}

/// Extract the slide identifier from a `{slide}_files` path segment.
pub fn slide_id_from_files(segment: &str) -> Option<&str> {
    segment.strip_suffix("_files").filter(|id| !id.is_empty())
}

/// Parse a tile file name like `3_5.jpeg` into `(col, row, extension)`.
///
/// Coordinates are parsed as signed integers so that range checking (and its
/// error reporting) stays with the pyramid. The extension is returned as-is.
pub fn parse_tile_name(name: &str) -> Option<(i64, i64, &str)> {
    let (coords, extension) = name.rsplit_once('.')?;
    let (col, row) = coords.split_once('_')?;

    Some((parse_coordinate(col)?, parse_coordinate(row)?, extension))
}

/// Parse a level, column or row from a URL segment.
///
/// Only plain decimal digits with an optional leading `-` are accepted, so
/// every tile has a single canonical URL.
pub fn parse_coordinate(segment: &str) -> Option<i64> {
    if segment.starts_with('+') {
        return None;
    }
    segment.parse().ok()
}
