//! Disk-backed tile cache with a single asynchronous fetch worker.
//!
//! `resolve` never blocks: it answers with the tile's canonical path right
//! away and, when the file is missing, queues a download for the worker.
//! Callers poll the path for existence. A new fetch batch discards whatever
//! is still queued, so tiles panned out of view are not downloaded after
//! the fact; a download already in flight always runs to completion.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, warn};

use foundation::mercator::{self, MAX_ZOOM};

use crate::fetch::{FetchTask, HttpFetcher, TileFetcher};
use crate::source::TileSource;

pub struct TileCache {
    root: PathBuf,
    source: TileSource,
    queue_tx: Sender<FetchTask>,
    // Second handle onto the same channel; the producer side drains through
    // it when a new batch starts.
    queue_rx: Receiver<FetchTask>,
}

impl TileCache {
    /// Opens a cache under `root` fetching over HTTP.
    pub fn open(root: impl Into<PathBuf>, source: TileSource) -> Result<Self, crate::FetchError> {
        let fetcher = HttpFetcher::new()?;
        Ok(Self::with_fetcher(root, source, Box::new(fetcher))?)
    }

    /// Opens a cache with a caller-supplied fetcher. Tests use this to stub
    /// the network.
    pub fn with_fetcher(
        root: impl Into<PathBuf>,
        source: TileSource,
        fetcher: Box<dyn TileFetcher>,
    ) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let (queue_tx, queue_rx) = unbounded();
        let worker_rx = queue_rx.clone();
        // Detached: the worker exits when the last sender is dropped.
        let _ = thread::Builder::new()
            .name("tile-fetch".into())
            .spawn(move || run_worker(worker_rx, fetcher))?;

        Ok(Self {
            root,
            source,
            queue_tx,
            queue_rx,
        })
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    /// Canonical local path for a tile, or `None` for an invalid key.
    ///
    /// `x` wraps modulo the world width; `y` outside `[0, 2^zoom)` has no
    /// tile (panning past the poles hits this constantly, so it is a normal
    /// answer rather than an error). The returned file may not exist yet:
    /// a missing tile is queued for the worker and the caller re-checks the
    /// path later.
    pub fn resolve(&self, zoom: u8, xtile: i64, ytile: i64) -> Option<PathBuf> {
        if zoom > MAX_ZOOM {
            return None;
        }
        let n = mercator::tiles_per_axis(zoom);
        let xtile = xtile.rem_euclid(n);
        if ytile < 0 || ytile >= n {
            return None;
        }

        let path = self
            .root
            .join(self.source.name())
            .join(zoom.to_string())
            .join(xtile.to_string())
            .join(format!("{ytile}.png"));
        if path.is_file() {
            return Some(path);
        }

        if let Some(url) = self.source.tile_url(xtile as u64, ytile as u64, zoom) {
            match path.parent().map(fs::create_dir_all) {
                Some(Ok(())) => {
                    // The send only fails when the worker is gone, in which
                    // case the tile simply stays absent.
                    let _ = self.queue_tx.send(FetchTask {
                        url,
                        dest: path.clone(),
                    });
                }
                Some(Err(err)) => {
                    warn!(path = %path.display(), %err, "cannot create tile directory");
                }
                None => {}
            }
        }

        // Valid key, though the file may not be present yet.
        Some(path)
    }

    /// Discards queued fetches that the worker has not picked up yet. An
    /// in-flight download is unaffected and completes (or fails) normally.
    ///
    /// Callers serialize batch starts; this is a producer-side operation.
    pub fn start_new_batch(&self) {
        let mut dropped = 0usize;
        while self.queue_rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(dropped, "discarded stale fetch tasks");
        }
    }

    /// Number of tasks waiting for the worker.
    pub fn queue_len(&self) -> usize {
        self.queue_rx.len()
    }
}

fn run_worker(queue: Receiver<FetchTask>, fetcher: Box<dyn TileFetcher>) {
    // Exits when every sender is gone, i.e. when the cache is dropped.
    while let Ok(task) = queue.recv() {
        if task.dest.is_file() {
            continue;
        }
        debug!(url = %task.url, "fetching tile");
        if let Err(err) = fetcher.fetch(&task.url, &task.dest) {
            // Not surfaced anywhere: the tile stays absent until a later
            // batch requests the same key again.
            warn!(url = %task.url, %err, "tile fetch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

    use super::TileCache;
    use crate::fetch::{FetchError, TileFetcher};
    use crate::source::TileSource;

    /// Writes a canned payload, counting and optionally gating each fetch.
    struct StubFetcher {
        fetched: Arc<AtomicUsize>,
        started_tx: Option<Sender<()>>,
        release_rx: Option<Receiver<()>>,
        fail: bool,
    }

    impl StubFetcher {
        fn counting(fetched: Arc<AtomicUsize>) -> Self {
            Self {
                fetched,
                started_tx: None,
                release_rx: None,
                fail: false,
            }
        }
    }

    impl TileFetcher for StubFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<(), FetchError> {
            if let Some(tx) = &self.started_tx {
                let _ = tx.send(());
            }
            if let Some(rx) = &self.release_rx {
                let _ = rx.recv_timeout(Duration::from_secs(5));
            }
            self.fetched.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(std::io::Error::other("simulated outage").into());
            }
            fs::write(dest, b"tile")?;
            Ok(())
        }
    }

    fn test_source() -> TileSource {
        TileSource::new("test_source", "https://tiles.example.org")
    }

    fn wait_for(path: &Path) -> bool {
        for _ in 0..200 {
            if path.is_file() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn resolve_is_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TileCache::with_fetcher(
            dir.path(),
            test_source(),
            Box::new(StubFetcher::counting(Arc::default())),
        )
        .expect("cache");

        let a = cache.resolve(3, 1, 2).expect("path");
        let b = cache.resolve(3, 1, 2).expect("path");
        assert_eq!(a, b);
        assert!(a.ends_with("test_source/3/1/2.png"));
    }

    #[test]
    fn x_wraps_and_y_does_not() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cache = TileCache::with_fetcher(
            dir.path(),
            test_source(),
            Box::new(StubFetcher::counting(Arc::default())),
        )
        .expect("cache");

        // 2^3 = 8 tiles per axis: x = 9 is x = 1, x = -1 is x = 7.
        assert_eq!(cache.resolve(3, 9, 0), cache.resolve(3, 1, 0));
        assert_eq!(cache.resolve(3, -1, 0), cache.resolve(3, 7, 0));
        assert!(cache.resolve(3, 0, -1).is_none());
        assert!(cache.resolve(3, 0, 8).is_none());
        assert!(cache.resolve(19, 0, 0).is_none());
    }

    #[test]
    fn missing_tiles_are_fetched_in_the_background() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetched = Arc::new(AtomicUsize::new(0));
        let cache = TileCache::with_fetcher(
            dir.path(),
            test_source(),
            Box::new(StubFetcher::counting(fetched.clone())),
        )
        .expect("cache");

        let path = cache.resolve(1, 0, 0).expect("path");
        assert!(wait_for(&path), "worker never produced {path:?}");
        assert_eq!(fetched.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn existing_tiles_are_not_re_enqueued() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetched = Arc::new(AtomicUsize::new(0));
        let cache = TileCache::with_fetcher(
            dir.path(),
            test_source(),
            Box::new(StubFetcher::counting(fetched.clone())),
        )
        .expect("cache");

        let path = cache.resolve(1, 0, 0).expect("path");
        assert!(wait_for(&path));

        let again = cache.resolve(1, 0, 0).expect("path");
        assert_eq!(again, path);
        assert_eq!(cache.queue_len(), 0);
    }

    #[test]
    fn failed_fetches_leave_the_tile_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetched = Arc::new(AtomicUsize::new(0));
        let fetcher = StubFetcher {
            fetched: fetched.clone(),
            started_tx: None,
            release_rx: None,
            fail: true,
        };
        let cache = TileCache::with_fetcher(dir.path(), test_source(), Box::new(fetcher))
            .expect("cache");

        let path = cache.resolve(1, 0, 0).expect("path");
        for _ in 0..100 {
            if fetched.load(Ordering::SeqCst) > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(fetched.load(Ordering::SeqCst) > 0);
        std::thread::sleep(Duration::from_millis(50));
        assert!(!path.is_file());
    }

    #[test]
    fn a_new_batch_drops_queued_tasks_but_not_the_in_flight_fetch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fetched = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = bounded(0);
        let fetcher = StubFetcher {
            fetched: fetched.clone(),
            started_tx: Some(started_tx),
            release_rx: Some(release_rx),
            fail: false,
        };
        let cache = TileCache::with_fetcher(dir.path(), test_source(), Box::new(fetcher))
            .expect("cache");

        // First tile: wait until the worker is inside the (gated) fetch.
        let first = cache.resolve(2, 0, 0).expect("path");
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("fetch started");

        // Queue more tiles behind it, then supersede the batch.
        let second = cache.resolve(2, 1, 0).expect("path");
        let third = cache.resolve(2, 2, 0).expect("path");
        assert_eq!(cache.queue_len(), 2);
        cache.start_new_batch();
        assert_eq!(cache.queue_len(), 0);

        // Release the in-flight fetch: it completes, the others never run.
        release_tx.send(()).expect("release");
        assert!(wait_for(&first), "in-flight fetch should still finish");
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(fetched.load(Ordering::SeqCst), 1);
        assert!(!second.is_file());
        assert!(!third.is_file());
    }
}
