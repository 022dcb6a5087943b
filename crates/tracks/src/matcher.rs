//! Matching a photograph's timestamp against recorded tracks.
//!
//! The result is the geotag to attach to the photograph: a position linearly
//! interpolated between the two track points bracketing the timestamp, or a
//! clamp to the nearest end of a track when the timestamp falls just outside
//! it. "No match" is a normal outcome, not an error.

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};

use crate::track::{Track, TrackPoint};

/// Default clamp window at the ends of a track, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// A position to attach to a photograph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geotag {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

/// A photograph's timestamp as extracted from its metadata.
///
/// Camera clocks are frequently timezone-naive; a naive timestamp is
/// resolved against a caller-supplied default offset (or UTC when none is
/// given) before matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhotoTime {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl PhotoTime {
    fn resolve(self, default_offset: Option<FixedOffset>) -> DateTime<FixedOffset> {
        match self {
            PhotoTime::Zoned(t) => t,
            PhotoTime::Naive(t) => {
                let offset = default_offset.unwrap_or_else(|| Utc.fix());
                match offset.from_local_datetime(&t) {
                    // A fixed offset always resolves a local time uniquely;
                    // the fallback arm is unreachable but keeps this total.
                    LocalResult::Single(dt) => dt,
                    _ => offset.from_utc_datetime(&t),
                }
            }
        }
    }
}

/// Matches `target` against each track in turn and returns the first match.
///
/// Which track "wins" when several could match is deliberately just
/// iteration order; no distance or confidence scoring is applied.
pub fn match_time<'a, I>(
    tracks: I,
    target: PhotoTime,
    tolerance_secs: i64,
    default_offset: Option<FixedOffset>,
) -> Option<Geotag>
where
    I: IntoIterator<Item = &'a Track>,
{
    let target = target.resolve(default_offset);
    let tolerance = Duration::seconds(tolerance_secs);
    tracks
        .into_iter()
        .find_map(|track| match_track(track, target, tolerance))
}

fn match_track(track: &Track, target: DateTime<FixedOffset>, tolerance: Duration) -> Option<Geotag> {
    let points = track.points();
    let first = points.first()?;
    let last = points.last()?;

    if target < first.time {
        if first.time - target <= tolerance {
            return Some(geotag_of(first));
        }
        return None;
    }
    if target >= last.time {
        if target - last.time <= tolerance {
            return Some(geotag_of(last));
        }
        return None;
    }

    points
        .windows(2)
        .find(|pair| target >= pair[0].time && target < pair[1].time)
        .map(|pair| interpolate(&pair[0], &pair[1], target))
}

fn geotag_of(p: &TrackPoint) -> Geotag {
    Geotag {
        lat: p.lat,
        lon: p.lon,
        altitude: p.altitude,
    }
}

fn interpolate(a: &TrackPoint, b: &TrackPoint, target: DateTime<FixedOffset>) -> Geotag {
    let span = (b.time - a.time).num_milliseconds();
    let ratio = if span > 0 {
        (target - a.time).num_milliseconds() as f64 / span as f64
    } else {
        0.0
    };
    let altitude = match (a.altitude, b.altitude) {
        (Some(x), Some(y)) => Some(x + (y - x) * ratio),
        _ => None,
    };
    Geotag {
        lat: a.lat + (b.lat - a.lat) * ratio,
        lon: a.lon + (b.lon - a.lon) * ratio,
        altitude,
    }
}
