//! Geographic bounding boxes that understand the ±180° longitude seam.
//!
//! A `Region` is either empty or a pair of corners `(nw, se)` with
//! `nw.lat >= se.lat`. Longitude ordering is deliberately *not* required:
//! when `nw.lon > se.lon` the region is read as wrapping through the
//! dateline ("type 2"), otherwise it is an ordinary box ("type 1").
//!
//! Known-fragile corners, inherited from the tool this engine replaces and
//! preserved on purpose:
//! - two regions that together close the full 360° of longitude are only
//!   detected via the type-mismatch heuristic in `union_region`;
//! - the closer-side tie-break for disjoint regions can legitimately pick
//!   either side in a dead heat;
//! - nothing is guaranteed for regions wrapping the globe more than once.

use crate::mercator::{self, MAX_ZOOM};
use crate::point::Point;

/// A geographic bounding box; the empty region is the additive identity.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Region {
    corners: Option<(Point, Point)>,
}

impl Region {
    pub fn empty() -> Self {
        Self { corners: None }
    }

    pub fn from_point(p: Point) -> Self {
        Self {
            corners: Some((p, p)),
        }
    }

    pub fn new(nw: Point, se: Point) -> Self {
        Self {
            corners: Some((nw, se)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_none()
    }

    pub fn nw(&self) -> Option<Point> {
        self.corners.map(|(nw, _)| nw)
    }

    pub fn se(&self) -> Option<Point> {
        self.corners.map(|(_, se)| se)
    }

    /// True for a region that does not span the dateline. Empty regions are
    /// trivially type 1.
    pub fn is_type1(&self) -> bool {
        match self.corners {
            Some((nw, se)) => nw.lon() <= se.lon(),
            None => true,
        }
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        match self.corners {
            Some((nw, se)) => lat <= nw.lat() && lat >= se.lat(),
            None => false,
        }
    }

    pub fn contains_lon(&self, lon: f64) -> bool {
        match self.corners {
            Some((nw, se)) => {
                if nw.lon() <= se.lon() {
                    lon >= nw.lon() && lon <= se.lon()
                } else {
                    // Wrapping region: inside means east of the west edge or
                    // west of the east edge.
                    lon >= nw.lon() || lon <= se.lon()
                }
            }
            None => false,
        }
    }

    pub fn contains_point(&self, p: Point) -> bool {
        self.contains_lat(p.lat()) && self.contains_lon(p.lon())
    }

    /// Region containment. Both of the other's corners must fall inside this
    /// region while neither of this region's corners falls inside the other;
    /// that second clause stops a region from claiming to contain an
    /// equal-or-larger one. Corner-identical regions contain each other.
    pub fn contains_region(&self, other: Region) -> bool {
        let (Some((nw, se)), Some((onw, ose))) = (self.corners, other.corners) else {
            return false;
        };
        if onw == nw && ose == se {
            return true;
        }
        self.contains_point(onw)
            && self.contains_point(ose)
            && !other.contains_point(nw)
            && !other.contains_point(se)
    }

    /// Smallest extension of this region that also covers `p`.
    pub fn union_point(self, p: Point) -> Region {
        if self.contains_point(p) {
            return self;
        }
        let Some((nw, se)) = self.corners else {
            return Region::from_point(p);
        };

        let n = nw.lat().max(p.lat());
        let s = se.lat().min(p.lat());
        let mut w = nw.lon();
        let mut e = se.lon();

        let need_change = if self.is_type1() {
            p.lon() < w || p.lon() > e
        } else {
            p.lon() < w && p.lon() > e
        };
        if need_change {
            // Extend whichever boundary is nearer, measuring both distances
            // eastward/westward with the wrap folded into [0, 360).
            let mut e_diff = p.lon() - e;
            if e_diff < 0.0 {
                e_diff += 360.0;
            }
            let mut w_diff = w - p.lon();
            if w_diff < 0.0 {
                w_diff += 360.0;
            }
            if e_diff < w_diff {
                e = p.lon();
            } else {
                w = p.lon();
            }
            // Guards against rounding collapsing the two edges onto each
            // other: that means the region now wraps the whole globe.
            if e == w {
                w = -180.0;
                e = 180.0;
            }
        }

        Region::new(Point::new(n, w), Point::new(s, e))
    }

    /// Union of two regions.
    pub fn union_region(self, other: Region) -> Region {
        if self.contains_region(other) {
            return self;
        }
        let Some((onw, ose)) = other.corners else {
            return self;
        };
        let Some((nw, se)) = self.corners else {
            return other;
        };

        // Latitude is easy: min/max of both extremes.
        let n = nw.lat().max(onw.lat());
        let s = se.lat().min(ose.lat());
        let w = nw.lon();
        let e = se.lon();
        let grown = Region::new(Point::new(n, w), Point::new(s, e));

        // Re-clip the other region to the grown latitude band so the corner
        // tests below are purely about longitude.
        let r_nw = Point::new(n, onw.lon());
        let r_se = Point::new(s, ose.lon());
        let r = Region::new(r_nw, r_se);

        if grown.contains_region(r) {
            return grown;
        }
        if r.contains_region(grown) {
            return r;
        }

        let mut count = 0;
        if !grown.contains_point(r_nw) {
            count += 1;
        }
        if !grown.contains_point(r_se) {
            count += 2;
        }

        // count is now 0 (nothing to extend), 1/2 (overlapping on one side)
        // or 3 (disjoint regions). Disjoint resolves to a single extension
        // side by whichever of the other's corners is closer, wrap-adjusted.
        if count == 3 {
            let mut e_diff = r_se.lon() - e;
            if e_diff < 0.0 {
                e_diff += 360.0;
            }
            let mut w_diff = w - r_nw.lon();
            if w_diff < 0.0 {
                w_diff += 360.0;
            }
            count = if e_diff < w_diff { 2 } else { 1 };
        }

        if grown.is_type1() != r.is_type1() && count == 0 {
            // Non-matching wrap classifications with no corner left outside:
            // the two regions close the globe between them.
            return Region::new(Point::new(n, -180.0), Point::new(s, 180.0));
        }

        match count {
            1 => grown.union_point(onw),
            2 => grown.union_point(ose),
            _ => grown,
        }
    }

    /// Geographic midpoint, corrected for the dateline on wrapping regions.
    pub fn centre(&self) -> Option<Point> {
        let (nw, se) = self.corners?;
        let lat = (nw.lat() + se.lat()) / 2.0;
        let mut lon = (nw.lon() + se.lon()) / 2.0;
        if !self.is_type1() {
            lon -= 180.0;
            if lon < -180.0 {
                lon += 360.0;
            }
        }
        Some(Point::new(lat, lon))
    }

    /// Highest zoom at which the whole region fits inside a viewport of the
    /// given pixel size; zoom 0 when nothing fits (or the region is empty).
    pub fn best_fit_zoom(&self, width: u32, height: u32) -> u8 {
        let Some((nw, se)) = self.corners else {
            return 0;
        };
        let mut best = 0;
        for zoom in 0..=MAX_ZOOM {
            let (tlx, tly) = mercator::pixel_coordinate(nw.lat(), nw.lon(), zoom);
            let (brx, bry) = mercator::pixel_coordinate(se.lat(), se.lon(), zoom);
            if brx - tlx < width as i64 && bry - tly < height as i64 {
                best = zoom;
            }
        }
        best
    }
}
