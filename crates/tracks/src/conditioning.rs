//! Conditioning of parsed point sequences before they become `Track`s.
//!
//! GPS recorders pause, glitch and restart; the parser hands over raw
//! per-segment sequences and these free functions reshape them: split on
//! long gaps, re-join segments the recorder needlessly broke apart, and
//! drop fragments too short to be useful. All of them assume (and keep)
//! time order.

use chrono::Duration;

use crate::track::TrackPoint;

/// Minimum points a sequence needs to survive `drop_short_tracks`.
pub const MIN_POINTS_PER_TRACK: usize = 2;

/// Splits a sequence wherever consecutive timestamps differ by at least
/// `gap_secs` seconds.
pub fn split_on_gaps(points: Vec<TrackPoint>, gap_secs: i64) -> Vec<Vec<TrackPoint>> {
    let gap = Duration::seconds(gap_secs);
    let mut out = Vec::new();
    let mut current: Vec<TrackPoint> = Vec::new();
    for p in points {
        if let Some(last) = current.last() {
            if p.time - last.time >= gap {
                out.push(std::mem::take(&mut current));
            }
        }
        current.push(p);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Joins consecutive time-ordered sequences separated by at most `gap_secs`
/// seconds (end of one to start of the next).
pub fn join_adjacent(sequences: Vec<Vec<TrackPoint>>, gap_secs: i64) -> Vec<Vec<TrackPoint>> {
    let gap = Duration::seconds(gap_secs);
    let mut out: Vec<Vec<TrackPoint>> = Vec::new();
    for seq in sequences {
        if seq.is_empty() {
            continue;
        }
        let joinable = match (out.last(), seq.first()) {
            (Some(prev), Some(next)) => prev
                .last()
                .map(|p| next.time - p.time <= gap)
                .unwrap_or(false),
            _ => false,
        };
        if joinable {
            if let Some(prev) = out.last_mut() {
                prev.extend(seq);
            }
        } else {
            out.push(seq);
        }
    }
    out
}

/// Discards sequences with fewer than `min_points` points.
pub fn drop_short_tracks(
    sequences: Vec<Vec<TrackPoint>>,
    min_points: usize,
) -> Vec<Vec<TrackPoint>> {
    sequences
        .into_iter()
        .filter(|s| s.len() >= min_points)
        .collect()
}
