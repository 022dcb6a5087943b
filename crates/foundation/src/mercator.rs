//! Web Mercator slicing between geographic coordinates and the tile grid.
//!
//! At zoom `z` the world is `2^z` tiles per axis, each `TILE_SIZE` pixels
//! square. All functions here are pure; latitudes at the poles blow up per
//! the Mercator formula, so callers rely on `Point` clamping upstream.

use std::f64::consts::PI;

/// Edge length of a map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Highest supported zoom level; valid zooms are `0..=MAX_ZOOM`.
pub const MAX_ZOOM: u8 = 18;

/// Number of tiles per axis at `zoom`.
pub fn tiles_per_axis(zoom: u8) -> i64 {
    1i64 << zoom
}

fn fractional_tiles(zoom: u8, lat: f64, lon: f64) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let xtile = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let ytile = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    (xtile, ytile)
}

/// Tile index and the pixel offset within that tile, per axis.
pub fn tile_and_pixel(zoom: u8, lat: f64, lon: f64) -> (i64, i64, i64, i64) {
    let (xtile, ytile) = fractional_tiles(zoom, lat, lon);
    let (xt, xp) = split(xtile);
    let (yt, yp) = split(ytile);
    (xt, xp, yt, yp)
}

fn split(tile: f64) -> (i64, i64) {
    let whole = tile.floor();
    let pixel = ((tile - whole) * TILE_SIZE as f64).round() as i64;
    (whole as i64, pixel)
}

/// Absolute pixel position of a coordinate in map space at `zoom`.
pub fn pixel_coordinate(lat: f64, lon: f64, zoom: u8) -> (i64, i64) {
    let (xtile, ytile) = fractional_tiles(zoom, lat, lon);
    let s = TILE_SIZE as f64;
    ((xtile * s).round() as i64, (ytile * s).round() as i64)
}

/// Inverse mapping from fractional tile coordinates to degrees.
pub fn lat_lon(xtile: f64, ytile: f64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let lon = xtile / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * ytile / n)).sinh().atan().to_degrees();
    (lat, lon)
}

/// Converts absolute pixel coordinates to degrees, wrapping modulo the world
/// size. Only the X wrap is geographically meaningful; Y values are expected
/// to be in range already.
pub fn pixel_to_lat_lon(px: i64, py: i64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let s = TILE_SIZE as f64;
    let xtile = (px as f64 / s).rem_euclid(n);
    let ytile = (py as f64 / s).rem_euclid(n);
    lat_lon(xtile, ytile, zoom)
}

#[cfg(test)]
mod tests {
    use super::{MAX_ZOOM, TILE_SIZE, lat_lon, pixel_coordinate, pixel_to_lat_lon, tile_and_pixel};

    #[test]
    fn zoom_zero_origin_is_the_dateline() {
        let (xt, xp, yt, yp) = tile_and_pixel(0, 0.0, -180.0);
        assert_eq!((xt, xp), (0, 0));
        assert_eq!(yt, 0);
        assert_eq!(yp, TILE_SIZE as i64 / 2);
    }

    #[test]
    fn greenwich_equator_is_the_world_centre() {
        let (x, y) = pixel_coordinate(0.0, 0.0, 0);
        assert_eq!((x, y), (128, 128));

        let (x, y) = pixel_coordinate(0.0, 0.0, 3);
        assert_eq!((x, y), (1024, 1024));
    }

    #[test]
    fn lat_lon_inverts_the_tile_origin() {
        let (lat, lon) = lat_lon(0.0, 0.0, 0);
        assert_eq!(lon, -180.0);
        assert!((lat - 85.051_128_779_806_6).abs() < 1e-9);
    }

    #[test]
    fn pixel_to_lat_lon_wraps_x() {
        let world = TILE_SIZE as i64; // zoom 0
        let (lat_a, lon_a) = pixel_to_lat_lon(10, 100, 0);
        let (lat_b, lon_b) = pixel_to_lat_lon(10 + world, 100, 0);
        assert_eq!(lat_a, lat_b);
        assert_eq!(lon_a, lon_b);
    }

    #[test]
    fn round_trip_recovers_position_within_one_pixel() {
        let samples = [
            (51.5, -0.12),
            (-33.86, 151.21),
            (84.9, 179.9),
            (-84.9, -179.9),
            (0.0, 0.0),
        ];
        for zoom in 0..=MAX_ZOOM {
            for &(lat, lon) in &samples {
                let (xt, xp, yt, yp) = tile_and_pixel(zoom, lat, lon);
                let s = TILE_SIZE as f64;
                let xtile = xt as f64 + xp as f64 / s;
                let ytile = yt as f64 + yp as f64 / s;
                let (rlat, rlon) = lat_lon(xtile, ytile, zoom);
                let (ox, oy) = pixel_coordinate(lat, lon, zoom);
                let (rx, ry) = pixel_coordinate(rlat, rlon, zoom);
                assert!(
                    (ox - rx).abs() <= 1 && (oy - ry).abs() <= 1,
                    "zoom {zoom} ({lat}, {lon}) drifted to ({rlat}, {rlon})"
                );
            }
        }
    }
}
