use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset};
use once_cell::sync::OnceCell;

use foundation::mercator;
use foundation::{Point, Region};

use crate::matcher::{self, Geotag, PhotoTime};

/// One timestamped sample from a GPS recording.
///
/// Produced by an external GPX/TCX parser; this crate never parses files.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub time: DateTime<FixedOffset>,
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

impl TrackPoint {
    pub fn new(time: DateTime<FixedOffset>, lat: f64, lon: f64, altitude: Option<f64>) -> Self {
        Self {
            time,
            lat,
            lon,
            altitude,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }
}

/// An immutable, time-ordered sequence of track points.
///
/// Timestamps are assumed non-decreasing; that is the parser's contract and
/// is not re-validated here. A track violating it produces undefined
/// matching results.
///
/// The covering region and the per-zoom pixel paths are computed on first
/// access and cached for the track's lifetime. Both caches are internally
/// synchronized so a `Track` can be shared across threads read-only.
#[derive(Debug)]
pub struct Track {
    points: Vec<TrackPoint>,
    region: OnceCell<Region>,
    paths: Mutex<BTreeMap<u8, Vec<(i64, i64)>>>,
}

impl Track {
    pub fn new(points: Vec<TrackPoint>) -> Self {
        Self {
            points,
            region: OnceCell::new(),
            paths: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        self.points.first().map(|p| p.time)
    }

    pub fn end_time(&self) -> Option<DateTime<FixedOffset>> {
        self.points.last().map(|p| p.time)
    }

    /// The smallest region covering every point, memoized after first call.
    pub fn region(&self) -> Region {
        *self.region.get_or_init(|| {
            self.points
                .iter()
                .fold(Region::empty(), |r, p| r.union_point(p.point()))
        })
    }

    /// The track projected to absolute pixel coordinates at `zoom`, with
    /// consecutive points that land on the same pixel collapsed. Memoized
    /// per zoom.
    pub fn pixel_path(&self, zoom: u8) -> Vec<(i64, i64)> {
        let mut cache = match self.paths.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache
            .entry(zoom)
            .or_insert_with(|| {
                let mut path = Vec::with_capacity(self.points.len());
                let mut last = None;
                for p in &self.points {
                    let coord = mercator::pixel_coordinate(p.lat, p.lon, zoom);
                    if Some(coord) != last {
                        path.push(coord);
                    }
                    last = Some(coord);
                }
                path
            })
            .clone()
    }

    /// Matches a photograph's timestamp against this single track.
    pub fn match_time(
        &self,
        target: PhotoTime,
        tolerance_secs: i64,
        default_offset: Option<FixedOffset>,
    ) -> Option<Geotag> {
        matcher::match_time(std::iter::once(self), target, tolerance_secs, default_offset)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;

    use super::{Track, TrackPoint};

    fn pt(secs: i64, lat: f64, lon: f64) -> TrackPoint {
        let utc = FixedOffset::east_opt(0).unwrap();
        TrackPoint::new(utc.timestamp_opt(secs, 0).unwrap(), lat, lon, None)
    }

    #[test]
    fn region_covers_all_points() {
        let track = Track::new(vec![
            pt(0, 50.0, -4.0),
            pt(10, 50.5, -3.5),
            pt(20, 51.0, -3.0),
        ]);
        let region = track.region();
        for p in track.points() {
            assert!(region.contains_point(p.point()));
        }
        assert_eq!(region.nw().unwrap().lat(), 51.0);
        assert_eq!(region.se().unwrap().lon(), -3.0);
    }

    #[test]
    fn region_is_memoized() {
        let track = Track::new(vec![pt(0, 50.0, -4.0)]);
        assert_eq!(track.region(), track.region());
    }

    #[test]
    fn pixel_path_collapses_consecutive_duplicates() {
        // Two nearby points land on the same pixel at zoom 0 but not at 18.
        let track = Track::new(vec![
            pt(0, 50.0, -4.0),
            pt(10, 50.000_1, -4.000_1),
            pt(20, 51.0, -3.0),
        ]);
        assert_eq!(track.pixel_path(0).len(), 2);
        assert_eq!(track.pixel_path(18).len(), 3);
    }

    #[test]
    fn empty_track_has_empty_region_and_path() {
        let track = Track::new(Vec::new());
        assert!(track.region().is_empty());
        assert!(track.pixel_path(10).is_empty());
        assert!(track.start_time().is_none());
    }
}
