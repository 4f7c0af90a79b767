//! Background tile loading.
//!
//! A [`TileLoader`] owns a small tokio runtime. Requests go into a bounded
//! `async_channel` queue drained by worker tasks; each worker reads a tile
//! file, decodes it synchronously, and sends the outcome back on an unbounded
//! result channel. The owner drains results without blocking via
//! [`TileLoader::try_next`], or blocks with [`TileLoader::next_blocking`]
//! during startup.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_channel::{Receiver, Sender, TrySendError};

use crate::error::{Error, Result};
use crate::format::SampleFormat;
use crate::tile::{ElevationTile, Tile, TileKey};

/// Worker pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    /// Runtime worker threads, also the number of decode tasks.
    pub threads: usize,
    /// Maximum number of queued requests.
    pub queue_depth: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            threads: 2,
            queue_depth: 256,
        }
    }
}

/// A tile to read and where to read it from.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub tile: Tile,
    pub path: PathBuf,
}

/// How a request resolved.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(ElevationTile),
    /// The tile file does not exist.
    Absent,
    Failed(Error),
}

/// A completed request.
#[derive(Debug)]
pub struct LoadResult {
    pub key: TileKey,
    pub outcome: LoadOutcome,
}

/// Decodes tile files on a background worker pool.
#[derive(Debug)]
pub struct TileLoader {
    runtime: Option<tokio::runtime::Runtime>,
    job_tx: Sender<LoadRequest>,
    result_rx: Receiver<LoadResult>,
    submitted: AtomicUsize,
}

impl TileLoader {
    /// Start the runtime and its worker tasks.
    pub fn new(
        options: LoaderOptions,
        format: SampleFormat,
        missing_data_signal: f64,
    ) -> Result<Self> {
        let threads = options.threads.max(1);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name("tile-loader")
            .enable_all()
            .build()
            .map_err(|source| Error::Runtime { source })?;

        let (job_tx, job_rx) = async_channel::bounded(options.queue_depth.max(1));
        let (result_tx, result_rx) = async_channel::unbounded();

        for _ in 0..threads {
            runtime.spawn(run_worker(
                job_rx.clone(),
                result_tx.clone(),
                format,
                missing_data_signal,
            ));
        }

        tracing::debug!(threads, queue_depth = options.queue_depth, "started tile loader");
        Ok(Self {
            runtime: Some(runtime),
            job_tx,
            result_rx,
            submitted: AtomicUsize::new(0),
        })
    }

    /// Queue a request without waiting.
    ///
    /// Returns `Ok(false)` when the queue is full; the request is dropped.
    pub fn try_submit(&self, request: LoadRequest) -> Result<bool> {
        match self.job_tx.try_send(request) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Closed(_)) => Err(Error::LoaderClosed),
        }
    }

    /// Queue a request, waiting for room in the queue.
    pub fn submit_blocking(&self, request: LoadRequest) -> Result<()> {
        self.job_tx
            .send_blocking(request)
            .map_err(|_| Error::LoaderClosed)?;
        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Take a completed request if one is ready.
    pub fn try_next(&self) -> Option<LoadResult> {
        self.result_rx.try_recv().ok()
    }

    /// Wait for the next completed request.
    pub fn next_blocking(&self) -> Result<LoadResult> {
        self.result_rx
            .recv_blocking()
            .map_err(|_| Error::LoaderClosed)
    }

    /// Total number of requests accepted since creation.
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl Drop for TileLoader {
    fn drop(&mut self) {
        self.job_tx.close();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn run_worker(
    jobs: Receiver<LoadRequest>,
    results: Sender<LoadResult>,
    format: SampleFormat,
    missing_data_signal: f64,
) {
    while let Ok(request) = jobs.recv().await {
        let key = request.tile.key().clone();
        let outcome = load(request, format, missing_data_signal).await;
        if results.send(LoadResult { key, outcome }).await.is_err() {
            break;
        }
    }
}

async fn load(request: LoadRequest, format: SampleFormat, missing_data_signal: f64) -> LoadOutcome {
    let LoadRequest { tile, path } = request;
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return LoadOutcome::Absent,
        Err(source) => return LoadOutcome::Failed(Error::Io { path, source }),
    };
    match decode_tile(tile, &path, &bytes, format, missing_data_signal) {
        Ok(tile) => LoadOutcome::Loaded(tile),
        Err(e) => LoadOutcome::Failed(e),
    }
}

/// Decode the raw contents of a tile file.
pub fn decode_tile(
    tile: Tile,
    path: &Path,
    bytes: &[u8],
    format: SampleFormat,
    missing_data_signal: f64,
) -> Result<ElevationTile> {
    let count = tile.width() * tile.height();
    let invalid = |detail: String| Error::InvalidTile {
        path: path.to_path_buf(),
        detail,
    };
    let samples = format.decode(bytes, count).ok_or_else(|| {
        invalid(format!(
            "expected {count} {} samples, found {} bytes",
            format.data_type(),
            bytes.len()
        ))
    })?;
    ElevationTile::from_samples(tile, samples, missing_data_signal)
        .ok_or_else(|| invalid("sample count does not match tile size".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ByteOrder, DataType};
    use crate::level::{LevelSet, LevelSetParams};
    use std::sync::Arc;
    use tessera_geo::LatLon;

    fn tile(levels: &LevelSet) -> Tile {
        let key = TileKey::new(0, 0, 0, Arc::from("Earth/Test"));
        Tile::new(key, levels).unwrap()
    }

    fn levels() -> LevelSet {
        let mut params = LevelSetParams::new("Earth/Test", LatLon::from_degrees(90.0, 90.0), 1);
        params.tile_width = 2;
        params.tile_height = 2;
        LevelSet::new(&params).unwrap()
    }

    fn int16() -> SampleFormat {
        SampleFormat::new(DataType::Int16, ByteOrder::LittleEndian).unwrap()
    }

    #[test]
    fn test_loads_absent_and_invalid_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let levels = levels();
        let loader = TileLoader::new(LoaderOptions::default(), int16(), -32768.0).unwrap();

        let good = dir.path().join("good.bil");
        let bytes: Vec<u8> = [1i16, 2, 3, 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(&good, bytes).unwrap();
        let short = dir.path().join("short.bil");
        std::fs::write(&short, [0u8; 3]).unwrap();

        for path in [good, dir.path().join("missing.bil"), short] {
            loader
                .submit_blocking(LoadRequest {
                    tile: tile(&levels),
                    path,
                })
                .unwrap();
        }
        assert_eq!(loader.submitted(), 3);

        let mut loaded = 0;
        let mut absent = 0;
        let mut failed = 0;
        for _ in 0..3 {
            match loader.next_blocking().unwrap().outcome {
                LoadOutcome::Loaded(tile) => {
                    assert_eq!(tile.elevations(), &[1.0, 2.0, 3.0, 4.0]);
                    loaded += 1;
                }
                LoadOutcome::Absent => absent += 1,
                LoadOutcome::Failed(Error::InvalidTile { .. }) => failed += 1,
                LoadOutcome::Failed(e) => panic!("unexpected error {e}"),
            }
        }
        assert_eq!((loaded, absent, failed), (1, 1, 1));
        assert!(loader.try_next().is_none());
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let levels = levels();
        let options = LoaderOptions {
            threads: 1,
            queue_depth: 1,
        };
        let loader = TileLoader::new(options, int16(), -32768.0).unwrap();

        // Workers race to drain the queue, so only the count is checked.
        let accepted = (0..64)
            .filter(|i| {
                loader
                    .try_submit(LoadRequest {
                        tile: tile(&levels),
                        path: PathBuf::from(format!("/nonexistent/{i}.bil")),
                    })
                    .unwrap()
            })
            .count();
        assert!(accepted >= 1);
        assert_eq!(loader.submitted(), accepted);
    }

    #[test]
    fn test_decode_tile_rejects_wrong_size() {
        let levels = levels();
        let result = decode_tile(
            tile(&levels),
            Path::new("t.bil"),
            &[0u8; 6],
            int16(),
            -32768.0,
        );
        assert!(matches!(result, Err(Error::InvalidTile { .. })));
    }
}
