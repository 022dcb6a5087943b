use serde::{Deserialize, Serialize};

use foundation::mercator::MAX_ZOOM;

fn default_max_zoom() -> u8 {
    MAX_ZOOM
}

/// A remote tile server: where its tiles live and over which zoom range.
///
/// Serde-derived so source definitions can come straight from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    name: String,
    url_prefix: String,
    #[serde(default)]
    attribution: Option<String>,
    #[serde(default)]
    min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    max_zoom: u8,
}

impl TileSource {
    pub fn new(name: impl Into<String>, url_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_prefix: url_prefix.into(),
            attribution: None,
            min_zoom: 0,
            max_zoom: MAX_ZOOM,
        }
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    /// The default public OpenStreetMap tile server.
    pub fn openstreetmap() -> Self {
        Self::new("openstreetmap.org_mapnik", "https://tile.openstreetmap.org")
            .with_attribution("© OpenStreetMap contributors")
    }

    /// Cache-directory name for this source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribution line to display over the map. Defaults to crediting the
    /// source by the part of its name before the first underscore.
    pub fn attribution(&self) -> String {
        match &self.attribution {
            Some(a) => a.clone(),
            None => {
                let host = self.name.split('_').next().unwrap_or(&self.name);
                format!("Tiles from {host}")
            }
        }
    }

    pub fn zoom_range(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    /// URL of one tile, or `None` when the source does not serve this zoom.
    pub fn tile_url(&self, xtile: u64, ytile: u64, zoom: u8) -> Option<String> {
        if zoom < self.min_zoom || zoom > self.max_zoom {
            return None;
        }
        Some(format!("{}/{}/{}/{}.png", self.url_prefix, zoom, xtile, ytile))
    }
}
