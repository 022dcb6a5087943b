use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use thiserror::Error;

/// One queued download: where to get a tile and where to put it.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTask {
    pub url: String,
    pub dest: PathBuf,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The seam between the cache worker and the network.
///
/// `fetch` must leave either a complete file at `dest` or nothing; partial
/// files would be mistaken for finished tiles by pollers.
pub trait TileFetcher: Send {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP fetcher. Downloads into a temporary file next to the
/// destination and atomically persists it, so a tile file either exists in
/// full or not at all.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        let response = self.client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(dest).map_err(|e| FetchError::Io(e.error))?;
        Ok(())
    }
}
