//! ---
//! rra_section: "01-core-functionality"
//! rra_subsection: "module"
//! rra_type: "source"
//! rra_scope: "code"
//! rra_description: "Map viewport geometry for addressing the embedded editor."
//! rra_version: "v0.0.0-prealpha"
//! rra_owner: "tbd"
//! ---
//! Web-mercator helpers used to point the editor frame at a project's extent.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use url::Url;

/// Bounding box as `[west, south, east, north]` in degrees.
pub type Bbox = [f64; 4];

/// Pixel size of a single map tile.
pub const TILE_SIZE: f64 = 256.0;
/// Highest zoom level handed to the editor.
pub const MAX_ZOOM: u8 = 19;

const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Zoom and center the editor opens at.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapLocation {
    pub zoom: u8,
    pub center: LatLng,
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (1.0 - (PI / 4.0 + lat / 2.0).tan().ln() / PI) / 2.0
}

fn inverse_mercator_y(y: f64) -> f64 {
    let n = PI * (1.0 - 2.0 * y);
    n.sinh().atan().to_degrees()
}

fn zoom_for_span(pixels: u32, span: f64) -> f64 {
    if span <= 0.0 {
        return f64::from(MAX_ZOOM);
    }
    (f64::from(pixels) / (TILE_SIZE * span)).log2()
}

/// Fit `bbox` into a `width` x `height` pixel viewport.
///
/// The zoom is the largest whole level at which the whole box is visible,
/// clamped to `0..=MAX_ZOOM`. A viewport with a zero dimension has not been
/// measured yet and yields zoom 0.
pub fn bounds_to_map_location(bbox: &Bbox, width: u32, height: u32) -> MapLocation {
    let [west, south, east, north] = *bbox;
    let x_west = (west + 180.0) / 360.0;
    let x_east = (east + 180.0) / 360.0;
    let y_north = mercator_y(north);
    let y_south = mercator_y(south);

    let center = LatLng {
        lat: inverse_mercator_y((y_north + y_south) / 2.0),
        lng: (west + east) / 2.0,
    };

    if width == 0 || height == 0 {
        return MapLocation { zoom: 0, center };
    }

    let zoom_x = zoom_for_span(width, (x_east - x_west).abs());
    let zoom_y = zoom_for_span(height, (y_south - y_north).abs());
    let zoom = zoom_x.min(zoom_y).floor().clamp(0.0, f64::from(MAX_ZOOM));

    MapLocation {
        zoom: zoom as u8,
        center,
    }
}

fn round_coordinate(value: f64) -> f64 {
    // adding 0.0 folds -0.0 into 0.0
    (value * 1e6).round() / 1e6 + 0.0
}

/// Editor URL with the `#map=zoom/lat/lng` fragment the editor reads on boot.
pub fn editor_url(base: &Url, location: &MapLocation) -> Url {
    let mut url = base.clone();
    url.set_fragment(Some(&format!(
        "map={}/{}/{}",
        location.zoom,
        round_coordinate(location.center.lat),
        round_coordinate(location.center.lng)
    )));
    url
}
