//! Pan/zoom state over the tile grid.
//!
//! The viewport tracks a top-left anchor in map-pixel space plus a zoom
//! level, works out which tiles cover the panel, and asks the tile cache
//! for each one. It decides *which* tile file should be shown where; how
//! the file is decoded and blitted is the rendering collaborator's concern.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use foundation::mercator::{self, MAX_ZOOM, TILE_SIZE};
use foundation::{Point, Region};
use streaming::TileCache;

const TILE: i64 = TILE_SIZE as i64;

/// Whether the tile's file is known to exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileState {
    Ready(PathBuf),
    Pending(PathBuf),
}

impl TileState {
    pub fn path(&self) -> &PathBuf {
        match self {
            TileState::Ready(p) | TileState::Pending(p) => p,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TileState::Ready(_))
    }
}

/// One tile of the current window and where it draws on the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleTile {
    pub xtile: i64,
    pub ytile: i64,
    pub state: TileState,
    /// Panel-relative draw position of the tile's top-left corner; can be
    /// negative for partially visible edge tiles.
    pub draw_x: i64,
    pub draw_y: i64,
}

/// Result of a `poll` pass over pending tiles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PollOutcome {
    /// At least one previously pending tile is now on disk (redraw needed).
    pub became_ready: bool,
    /// Tiles are still missing (poll again later).
    pub still_pending: bool,
}

pub struct Viewport {
    zoom: u8,
    // Top-left of the panel in map-pixel space. `tlx` is renormalized to
    // non-negative (modulo the world width) whenever tiles are populated;
    // `tly` is never wrapped.
    tlx: i64,
    tly: i64,
    width: u32,
    height: u32,
    tiles: Vec<VisibleTile>,
    // Ready-state carried between populations at an unchanged zoom, the
    // analogue of keeping decoded tile images across a pan.
    states: BTreeMap<(i64, i64), TileState>,
    states_zoom: u8,
}

impl Viewport {
    /// A viewport over the whole world: zoom 0 with the single world tile
    /// centred on the panel.
    pub fn new(width: u32, height: u32) -> Self {
        let world = TILE; // zoom 0
        Self {
            zoom: 0,
            tlx: (world - width as i64) / 2,
            tly: (world - height as i64) / 2,
            width,
            height,
            tiles: Vec::new(),
            states: BTreeMap::new(),
            states_zoom: 0,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn visible_tiles(&self) -> &[VisibleTile] {
        &self.tiles
    }

    /// Moves the map anchor by a pixel delta.
    pub fn pan(&mut self, dx: i64, dy: i64) {
        self.tlx += dx;
        self.tly += dy;
    }

    /// Resizes the panel, keeping the current centre fixed.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.tlx += (self.width as i64 - width as i64) / 2;
        self.tly += (self.height as i64 - height as i64) / 2;
        self.width = width;
        self.height = height;
    }

    /// Centres the viewport on a coordinate, optionally changing zoom.
    pub fn centre_on(&mut self, lat: f64, lon: f64, zoom: Option<u8>) {
        if let Some(zoom) = zoom {
            self.zoom = zoom.min(MAX_ZOOM);
        }
        let (ax, ay) = (self.width as i64 / 2, self.height as i64 / 2);
        self.place(lat, lon, ax, ay);
    }

    /// Changes zoom while keeping the geographic point under `anchor`
    /// (panel-relative pixels; defaults to the centre) fixed on screen.
    pub fn zoom_to(&mut self, zoom: u8, anchor: Option<(i64, i64)>) {
        let (ax, ay) = anchor.unwrap_or((self.width as i64 / 2, self.height as i64 / 2));
        let (lat, lon) = mercator::pixel_to_lat_lon(self.tlx + ax, self.tly + ay, self.zoom);
        self.zoom = zoom.min(MAX_ZOOM);
        self.place(lat, lon, ax, ay);
    }

    /// Frames a region: best-fit zoom, centred. No-op for an empty region.
    pub fn frame_region(&mut self, region: &Region) {
        let Some(centre) = region.centre() else {
            return;
        };
        let zoom = region.best_fit_zoom(self.width, self.height);
        debug!(zoom, "framing region");
        self.centre_on(centre.lat(), centre.lon(), Some(zoom));
    }

    fn place(&mut self, lat: f64, lon: f64, ax: i64, ay: i64) {
        let (xt, xp, yt, yp) = mercator::tile_and_pixel(self.zoom, lat, lon);
        self.tlx = xt * TILE + xp - ax;
        self.tly = yt * TILE + yp - ay;
    }

    /// Recomputes the visible tile window and requests every tile from the
    /// cache. Starts a new fetch batch first, so downloads queued for a
    /// previous window are abandoned. Returns true when any tile is still
    /// pending (callers should `poll` until it no longer is).
    pub fn populate(&mut self, cache: &TileCache) -> bool {
        cache.start_new_batch();

        let world = mercator::tiles_per_axis(self.zoom) * TILE;
        while self.tlx < 0 {
            self.tlx += world;
        }

        let xtile = self.tlx / TILE;
        let ytile = self.tly.div_euclid(TILE);
        // Panel position of the top-left tile's origin.
        let xord = -(self.tlx - xtile * TILE);
        let yord = -(self.tly - ytile * TILE);

        let carried = if self.zoom == self.states_zoom {
            std::mem::take(&mut self.states)
        } else {
            self.states.clear();
            BTreeMap::new()
        };
        self.states_zoom = self.zoom;
        self.tiles.clear();

        let xnum = (self.width.saturating_sub(1) as i64) / TILE + 1;
        let ynum = (self.height.saturating_sub(1) as i64) / TILE + 1;
        let mut pending = false;
        for x in 0..=xnum {
            for y in 0..=ynum {
                let xi = xtile + x;
                let yi = ytile + y;
                let state = match carried.get(&(xi, yi)) {
                    Some(state @ TileState::Ready(_)) => state.clone(),
                    _ => match cache.resolve(self.zoom, xi, yi) {
                        Some(path) if path.is_file() => TileState::Ready(path),
                        Some(path) => TileState::Pending(path),
                        // Off the top or bottom of the world: no tile here.
                        None => continue,
                    },
                };
                pending |= !state.is_ready();
                self.states.insert((xi, yi), state.clone());
                self.tiles.push(VisibleTile {
                    xtile: xi,
                    ytile: yi,
                    state,
                    draw_x: xord + x * TILE,
                    draw_y: yord + y * TILE,
                });
            }
        }
        pending
    }

    /// Re-checks pending tiles on disk, promoting any that have appeared.
    pub fn poll(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        for tile in &mut self.tiles {
            if let TileState::Pending(path) = &tile.state {
                if path.is_file() {
                    let ready = TileState::Ready(path.clone());
                    self.states.insert((tile.xtile, tile.ytile), ready.clone());
                    tile.state = ready;
                    outcome.became_ready = true;
                } else {
                    outcome.still_pending = true;
                }
            }
        }
        outcome
    }

    /// The geographic region covered by the panel, saturating to the full
    /// lat/lon span on any axis where the panel is larger than the world.
    pub fn visible_region(&self) -> Region {
        let world = mercator::tiles_per_axis(self.zoom) * TILE;
        let lat_wraps = self.height as i64 >= world;
        let lon_wraps = self.width as i64 >= world;

        let (lat, lon) = mercator::pixel_to_lat_lon(self.tlx, self.tly, self.zoom);
        let nw = Point::new(
            if lat_wraps { 90.0 } else { lat },
            if lon_wraps { -180.0 } else { lon },
        );
        let (lat, lon) = mercator::pixel_to_lat_lon(
            self.tlx + self.width as i64,
            self.tly + self.height as i64,
            self.zoom,
        );
        let se = Point::new(
            if lat_wraps { -90.0 } else { lat },
            if lon_wraps { 180.0 } else { lon },
        );
        Region::new(nw, se)
    }
}
