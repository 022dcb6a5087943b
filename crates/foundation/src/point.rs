/// A geographic coordinate in degrees.
///
/// Latitude and longitude are clamped to `[-90, 90]` and `[-180, 180]` at
/// construction, so downstream code (projection, regions) can assume both
/// are in range. Immutable value type.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point {
    lat: f64,
    lon: f64,
}

impl Point {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat: lat.clamp(-90.0, 90.0),
            lon: lon.clamp(-180.0, 180.0),
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}
