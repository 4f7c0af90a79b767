//! The tiled elevation model: tile residency, background loading and
//! elevation queries.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tessera_geo::{Angle, Sector, SectorKey};

use crate::cache::{MemoryCache, MutexMap, MutexSet};
use crate::config::{ElevationConfig, keys};
use crate::elevations::Elevations;
use crate::error::Result;
use crate::extremes::ExtremeElevations;
use crate::format::SampleFormat;
use crate::level::LevelSet;
use crate::loader::{LoadOutcome, LoadRequest, LoadResult, LoaderOptions, TileLoader};
use crate::tile::{ElevationTile, Tile, TileKey};

/// Default byte budget for tiles above level zero.
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 64 * 1024 * 1024;
/// Default missing-data signal, the SRTM void value.
pub const DEFAULT_MISSING_DATA_SIGNAL: f64 = -32768.0;

const DEFAULT_ELEVATION_MIN: f64 = -11_000.0;
const DEFAULT_ELEVATION_MAX: f64 = 8_850.0;
const EXTREMES_MEMO_LIMIT: usize = 16_384;

/// A multi-resolution elevation raster backed by tile files on disk.
///
/// Level-zero tiles are never evicted once loaded; finer tiles live in a
/// size-bounded LRU cache. Each tile moves from unknown, to requested (held
/// in the in-flight set), to resident. Requests never block: results are
/// picked up by [`ElevationModel::poll`], so a tile requested during one
/// frame is at the earliest usable in the next.
///
/// All methods take `&self`; the in-flight set, both tile stores and the
/// extremes memo are each guarded by their own lock.
#[derive(Debug)]
pub struct ElevationModel {
    levels: LevelSet,
    store_path: PathBuf,
    min_elevation: f64,
    max_elevation: f64,
    missing_data_signal: f64,
    missing_data_replacement: f64,
    detail_hint: f64,
    extremes: Option<ExtremeElevations>,
    extremes_memo: Mutex<HashMap<SectorKey, (f64, f64)>>,
    level_zero_tiles: MutexMap<TileKey, ElevationTile>,
    tile_cache: MemoryCache<TileKey, ElevationTile>,
    in_flight: MutexSet<TileKey>,
    loader: TileLoader,
    generation: AtomicU64,
}

impl ElevationModel {
    /// Build a model from dataset configuration and start its loader.
    ///
    /// Fails with [`crate::Error::UnsupportedFormat`] when the dataset's sample
    /// type or byte order cannot be decoded.
    pub fn from_config(config: &ElevationConfig) -> Result<Self> {
        let levels = LevelSet::from_config(config)?;

        let data_type: String = config.get_or(keys::DATA_TYPE, "Int16".to_string())?;
        let byte_order: String = config.get_or(keys::BYTE_ORDER, "LittleEndian".to_string())?;
        let format = SampleFormat::parse(&data_type, &byte_order)?;

        let store_path: PathBuf = config.get_value(keys::MODEL_STORE_PATH)?;
        let min_elevation = config.get_or(keys::ELEVATION_MIN, DEFAULT_ELEVATION_MIN)?;
        let max_elevation = config.get_or(keys::ELEVATION_MAX, DEFAULT_ELEVATION_MAX)?;
        let detail_hint = config.get_or(keys::DETAIL_HINT, 0.0)?;
        let missing_data_signal =
            config.get_or(keys::MISSING_DATA_SIGNAL, DEFAULT_MISSING_DATA_SIGNAL)?;
        let missing_data_replacement = config.get_or(keys::MISSING_DATA_REPLACEMENT, 0.0)?;
        let cache_capacity =
            config.get_or(keys::TILE_CACHE_CAPACITY, DEFAULT_TILE_CACHE_CAPACITY)?;

        let defaults = LoaderOptions::default();
        let options = LoaderOptions {
            threads: config.get_or(keys::LOADER_THREADS, defaults.threads)?,
            queue_depth: config.get_or(keys::LOADER_QUEUE_DEPTH, defaults.queue_depth)?,
        };

        let extremes = config
            .get_optional::<PathBuf>(keys::ELEVATION_EXTREMES_FILE)?
            .map(|path| ExtremeElevations::load(&path, &levels))
            .transpose()?;

        let loader = TileLoader::new(options, format, missing_data_signal)?;

        tracing::info!(
            store = %store_path.display(),
            levels = levels.num_levels(),
            sector = %levels.sector(),
            data_type = %format.data_type(),
            extremes = extremes.is_some(),
            "created elevation model"
        );

        Ok(Self {
            levels,
            store_path,
            min_elevation,
            max_elevation,
            missing_data_signal,
            missing_data_replacement,
            detail_hint,
            extremes,
            extremes_memo: Mutex::new(HashMap::new()),
            level_zero_tiles: MutexMap::new(),
            tile_cache: MemoryCache::new(cache_capacity),
            in_flight: MutexSet::new(),
            loader,
            generation: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    #[must_use]
    pub fn sector(&self) -> &Sector {
        self.levels.sector()
    }

    #[must_use]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    #[must_use]
    pub fn contains(&self, latitude: Angle, longitude: Angle) -> bool {
        self.levels.sector().contains(latitude, longitude)
    }

    #[must_use]
    pub fn min_elevation(&self) -> f64 {
        self.min_elevation
    }

    #[must_use]
    pub fn max_elevation(&self) -> f64 {
        self.max_elevation
    }

    #[must_use]
    pub fn missing_data_signal(&self) -> f64 {
        self.missing_data_signal
    }

    #[must_use]
    pub fn missing_data_replacement(&self) -> f64 {
        self.missing_data_replacement
    }

    /// Log10 bias applied to tessellation detail; positive means finer.
    #[must_use]
    pub fn detail_hint(&self) -> f64 {
        self.detail_hint
    }

    /// Texel size of the finest level, in radians.
    #[must_use]
    pub fn best_resolution(&self) -> f64 {
        self.levels.last_level().texel_size()
    }

    #[must_use]
    pub fn extremes(&self) -> Option<&ExtremeElevations> {
        self.extremes.as_ref()
    }

    /// Counter bumped every time a tile becomes resident.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of requests still in flight.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.in_flight.len()
    }

    #[must_use]
    pub fn resident_tile_count(&self) -> usize {
        self.level_zero_tiles.len() + self.tile_cache.len()
    }

    /// Bytes held by the cache of tiles above level zero.
    #[must_use]
    pub fn cached_bytes(&self) -> usize {
        self.tile_cache.size()
    }

    /// Requests accepted by the loader since the model was created.
    #[must_use]
    pub fn loads_submitted(&self) -> usize {
        self.loader.submitted()
    }

    /// File holding `key`: `<store>/<level path>/<row>/<row>_<col><suffix>`.
    pub fn tile_path(&self, key: &TileKey) -> Result<PathBuf> {
        let level = self.levels.level(key.level())?;
        Ok(self.store_path.join(level.tile_file(key.row(), key.col())))
    }

    #[must_use]
    pub fn is_resident(&self, key: &TileKey) -> bool {
        if key.level() == 0 {
            self.level_zero_tiles.contains_key(key)
        } else {
            self.tile_cache.contains(key)
        }
    }

    /// A resident tile, if any.
    #[must_use]
    pub fn tile_from_memory(&self, key: &TileKey) -> Option<Arc<ElevationTile>> {
        if key.level() == 0 {
            self.level_zero_tiles.get(key)
        } else {
            self.tile_cache.get(key)
        }
    }

    /// Schedule a tile load without waiting for it.
    ///
    /// Returns `Ok(true)` when a load was queued, and `Ok(false)` when the
    /// tile is already resident, already in flight, or the loader queue is
    /// full (a later request will try again).
    pub fn request_tile(&self, key: &TileKey) -> Result<bool> {
        if self.is_resident(key) {
            return Ok(false);
        }
        let request = self.load_request(key)?;
        if !self.claim(key) {
            return Ok(false);
        }

        match self.loader.try_submit(request) {
            Ok(true) => {
                tracing::trace!(%key, "requested tile");
                Ok(true)
            }
            Ok(false) => {
                self.in_flight.remove(key);
                tracing::debug!(%key, "loader queue full, request dropped");
                Ok(false)
            }
            Err(e) => {
                self.in_flight.remove(key);
                Err(e)
            }
        }
    }

    /// Move finished loads into residence. Never blocks.
    ///
    /// Returns the number of tiles that became resident.
    pub fn poll(&self) -> usize {
        let mut landed = 0;
        while let Some(result) = self.loader.try_next() {
            if self.complete(result) {
                landed += 1;
            }
        }
        landed
    }

    /// Request every level-zero tile and wait until each has resolved.
    ///
    /// Returns the number of level-zero tiles resident afterwards; tiles
    /// whose files are missing simply stay absent.
    pub fn load_all_level_zero_tiles(&self) -> Result<usize> {
        let keys = self.levels.level_zero_keys();
        for key in &keys {
            if self.is_resident(key) {
                continue;
            }
            let request = self.load_request(key)?;
            if !self.claim(key) {
                continue;
            }
            if let Err(e) = self.loader.submit_blocking(request) {
                self.in_flight.remove(key);
                return Err(e);
            }
        }

        let mut waiting: HashSet<&TileKey> =
            keys.iter().filter(|k| self.in_flight.contains(k)).collect();
        while !waiting.is_empty() {
            let result = self.loader.next_blocking()?;
            waiting.remove(&result.key);
            self.complete(result);
        }

        let resident = keys.iter().filter(|k| self.is_resident(k)).count();
        tracing::info!(resident, total = keys.len(), "level zero tiles loaded");
        Ok(resident)
    }

    /// Block until every in-flight request has resolved.
    ///
    /// Meant for tools and tests; interactive callers should use
    /// [`ElevationModel::poll`].
    pub fn finish_pending(&self) -> Result<usize> {
        let mut landed = 0;
        while !self.in_flight.is_empty() {
            if self.complete(self.loader.next_blocking()?) {
                landed += 1;
            }
        }
        Ok(landed)
    }

    /// Collect the tiles covering `sector` at `target_level`.
    ///
    /// Resident tiles are returned immediately and missing ones are
    /// requested. For each missing tile the nearest resident ancestor is
    /// included instead, so once level zero is loaded the region is always
    /// covered at some resolution.
    pub fn get_elevations(&self, sector: &Sector, target_level: usize) -> Result<Elevations> {
        let level = self.levels.level(target_level)?;
        let Some(region) = sector.intersection(self.levels.sector()) else {
            return Ok(Elevations::new(
                *sector,
                target_level,
                Vec::new(),
                true,
                self.missing_data_signal,
                (self.min_elevation, self.max_elevation),
            ));
        };

        let keys = self.levels.tile_keys_in(&region, level);
        let mut tiles = Vec::with_capacity(keys.len());
        let mut seen = HashSet::new();
        let mut complete = true;

        for key in keys {
            if let Some(tile) = self.tile_from_memory(&key) {
                if seen.insert(key) {
                    tiles.push(tile);
                }
                continue;
            }

            complete = false;
            self.request_tile(&key)?;
            if let Some(ancestor) = self.resident_ancestor(&key) {
                if seen.insert(ancestor.key().clone()) {
                    tiles.push(ancestor);
                }
            }
        }

        Ok(Elevations::new(
            region,
            target_level,
            tiles,
            complete,
            self.missing_data_signal,
            self.extreme_elevations_in(&region),
        ))
    }

    /// Elevation at a location, without replacing missing data.
    ///
    /// Samples the finest resident tile containing the location. With
    /// nothing resident, requests the level-zero tile and returns the
    /// location's minimum extreme elevation.
    #[must_use]
    pub fn unmapped_elevation(&self, latitude: Angle, longitude: Angle) -> f64 {
        if !self.contains(latitude, longitude) {
            return self.missing_data_signal;
        }

        let finest = TileKey::from_lat_lon(latitude, longitude, &self.levels, self.levels.last_level());
        let tile = self
            .tile_from_memory(&finest)
            .or_else(|| self.resident_ancestor(&finest));
        if let Some(tile) = tile {
            return tile.look_up_elevation(latitude, longitude);
        }

        let root = TileKey::from_lat_lon(latitude, longitude, &self.levels, self.levels.first_level());
        if let Err(e) = self.request_tile(&root) {
            tracing::warn!(key = %root, error = %e, "failed to request level zero tile");
        }
        self.extreme_elevations_at(latitude, longitude).0
    }

    /// Elevation at a location, with missing data replaced.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn elevation(&self, latitude: Angle, longitude: Angle) -> f64 {
        let elevation = self.unmapped_elevation(latitude, longitude);
        if elevation == self.missing_data_signal {
            self.missing_data_replacement
        } else {
            elevation
        }
    }

    /// `(min, max)` elevation at a location.
    #[must_use]
    pub fn extreme_elevations_at(&self, latitude: Angle, longitude: Angle) -> (f64, f64) {
        self.extremes.as_ref().map_or(
            (self.min_elevation, self.max_elevation),
            |extremes| extremes.at(latitude, longitude),
        )
    }

    /// `(min, max)` elevation over a sector. Results are memoized per sector.
    #[must_use]
    pub fn extreme_elevations_in(&self, sector: &Sector) -> (f64, f64) {
        let Some(extremes) = &self.extremes else {
            return (self.min_elevation, self.max_elevation);
        };

        let key = sector.key();
        if let Some(cached) = self.extremes_memo.lock().get(&key) {
            return *cached;
        }

        let value = extremes.in_sector(sector);
        let mut memo = self.extremes_memo.lock();
        if memo.len() >= EXTREMES_MEMO_LIMIT {
            memo.clear();
        }
        memo.insert(key, value);
        value
    }

    fn load_request(&self, key: &TileKey) -> Result<LoadRequest> {
        Ok(LoadRequest {
            tile: Tile::new(key.clone(), &self.levels)?,
            path: self.tile_path(key)?,
        })
    }

    fn resident_ancestor(&self, key: &TileKey) -> Option<Arc<ElevationTile>> {
        let mut current = key.parent();
        while let Some(ancestor) = current {
            if let Some(tile) = self.tile_from_memory(&ancestor) {
                return Some(tile);
            }
            current = ancestor.parent();
        }
        None
    }

    /// Mark `key` in flight. Fails if it already is, or if it landed
    /// between the caller's residency check and the claim.
    fn claim(&self, key: &TileKey) -> bool {
        if !self.in_flight.insert(key.clone()) {
            return false;
        }
        if self.is_resident(key) {
            self.in_flight.remove(key);
            return false;
        }
        true
    }

    /// Record a finished load. Returns true if a tile became resident.
    ///
    /// The tile is made resident before its in-flight marker is cleared, so
    /// a concurrent request always sees one or the other.
    fn complete(&self, result: LoadResult) -> bool {
        let LoadResult { key, outcome } = result;
        let landed = match outcome {
            LoadOutcome::Loaded(tile) => {
                let tile = Arc::new(tile);
                if key.level() == 0 {
                    self.level_zero_tiles.insert(key.clone(), tile);
                } else if !self.tile_cache.put(key.clone(), tile) {
                    tracing::warn!(%key, "tile larger than the tile cache, dropped");
                    self.in_flight.remove(&key);
                    return false;
                }
                self.generation.fetch_add(1, Ordering::AcqRel);
                tracing::debug!(%key, "tile loaded");
                true
            }
            LoadOutcome::Absent => {
                tracing::debug!(%key, "tile absent");
                false
            }
            LoadOutcome::Failed(e) => {
                tracing::warn!(%key, error = %e, "tile load failed");
                false
            }
        };
        self.in_flight.remove(&key);
        landed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    const CACHE_NAME: &str = "Earth/Test";

    /// A whole-globe dataset: 90 degree level-zero tiles (2 rows by 4
    /// columns), three levels, 4x4 Int16 samples.
    fn config(store: &Path) -> ElevationConfig {
        ElevationConfig::from_pairs([
            (keys::NUM_LEVELS, "3".to_string()),
            (keys::LEVEL_ZERO_TILE_DELTA, "90,90".to_string()),
            (keys::TILE_WIDTH, "4".to_string()),
            (keys::TILE_HEIGHT, "4".to_string()),
            (keys::DATA_CACHE_NAME, CACHE_NAME.to_string()),
            (keys::FORMAT_SUFFIX, ".bil".to_string()),
            (keys::DATA_TYPE, "Int16".to_string()),
            (keys::BYTE_ORDER, "LittleEndian".to_string()),
            (keys::MODEL_STORE_PATH, store.display().to_string()),
            (keys::ELEVATION_MIN, "-400".to_string()),
            (keys::ELEVATION_MAX, "8000".to_string()),
            (keys::MISSING_DATA_REPLACEMENT, "5".to_string()),
        ])
    }

    fn key(level: usize, row: i32, col: i32) -> TileKey {
        TileKey::new(level, row, col, Arc::from(CACHE_NAME))
    }

    fn write_tile(model: &ElevationModel, key: &TileKey, value: i16) {
        let path = model.tile_path(key).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let bytes: Vec<u8> = std::iter::repeat_n(value, 16)
            .flat_map(i16::to_le_bytes)
            .collect();
        std::fs::write(path, bytes).unwrap();
    }

    fn model() -> (TempDir, ElevationModel) {
        let dir = tempfile::tempdir().unwrap();
        let model = ElevationModel::from_config(&config(dir.path())).unwrap();
        (dir, model)
    }

    fn write_level_zero(model: &ElevationModel, value: i16) {
        for key in model.levels().level_zero_keys() {
            write_tile(model, &key, value);
        }
    }

    #[test]
    fn test_rejects_unsupported_formats() {
        let dir = tempfile::tempdir().unwrap();
        let mut big_endian = config(dir.path());
        big_endian.set_value(keys::BYTE_ORDER, "BigEndian");
        assert!(matches!(
            ElevationModel::from_config(&big_endian),
            Err(Error::UnsupportedFormat { .. })
        ));

        let mut bytes = config(dir.path());
        bytes.set_value(keys::DATA_TYPE, "Int8");
        assert!(matches!(
            ElevationModel::from_config(&bytes),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_tile_path_layout() {
        let (dir, model) = model();
        let path = model.tile_path(&key(2, 5, 11)).unwrap();
        assert_eq!(path, dir.path().join("Earth/Test/2/5/5_11.bil"));
        assert!(matches!(
            model.tile_path(&key(3, 0, 0)),
            Err(Error::LevelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_load_all_level_zero_tiles() {
        let (_dir, model) = model();
        write_level_zero(&model, 100);

        assert_eq!(model.load_all_level_zero_tiles().unwrap(), 8);
        assert_eq!(model.resident_tile_count(), 8);
        assert_eq!(model.pending_requests(), 0);
        assert_eq!(model.generation(), 8);

        // Everything resident: nothing new is submitted.
        assert_eq!(model.load_all_level_zero_tiles().unwrap(), 8);
        assert_eq!(model.loads_submitted(), 8);
    }

    #[test]
    fn test_load_all_level_zero_tolerates_missing_files() {
        let (_dir, model) = model();
        let keys = model.levels().level_zero_keys();
        for key in &keys[1..] {
            write_tile(&model, key, 100);
        }

        assert_eq!(model.load_all_level_zero_tiles().unwrap(), 7);
        assert!(!model.is_resident(&keys[0]));
        assert_eq!(model.pending_requests(), 0);
    }

    #[test]
    fn test_duplicate_requests_load_once() {
        let (_dir, model) = model();
        let k = key(1, 2, 4);
        write_tile(&model, &k, 200);

        assert!(model.request_tile(&k).unwrap());
        assert!(!model.request_tile(&k).unwrap());
        assert_eq!(model.loads_submitted(), 1);

        assert_eq!(model.finish_pending().unwrap(), 1);
        assert!(model.is_resident(&k));
        assert_eq!(model.resident_tile_count(), 1);
        assert!(model.cached_bytes() > 0);

        // Resident tiles are not requested again.
        assert!(!model.request_tile(&k).unwrap());
        assert_eq!(model.loads_submitted(), 1);
    }

    #[test]
    fn test_concurrent_requests_load_once() {
        let (_dir, model) = model();
        let levels = model.levels();
        let tile_keys = levels.tile_keys_in(levels.sector(), levels.level(2).unwrap());
        assert_eq!(tile_keys.len(), 128);
        for k in &tile_keys {
            write_tile(&model, k, 300);
        }

        // Requesters hammer each key while this thread lands results, so
        // requests race the hand-over from in flight to resident.
        for k in &tile_keys {
            std::thread::scope(|scope| {
                for _ in 0..3 {
                    scope.spawn(|| {
                        while !model.is_resident(k) {
                            model.request_tile(k).unwrap();
                        }
                    });
                }
                while !model.is_resident(k) {
                    model.poll();
                    std::thread::yield_now();
                }
            });
        }

        assert_eq!(model.loads_submitted(), tile_keys.len());
        assert_eq!(model.generation(), tile_keys.len() as u64);
        assert_eq!(model.pending_requests(), 0);
        assert_eq!(model.resident_tile_count(), tile_keys.len());
    }

    #[test]
    fn test_missing_file_clears_in_flight() {
        let (_dir, model) = model();
        let k = key(2, 3, 3);

        assert!(model.request_tile(&k).unwrap());
        assert_eq!(model.pending_requests(), 1);
        assert_eq!(model.finish_pending().unwrap(), 0);

        assert!(!model.is_resident(&k));
        assert_eq!(model.pending_requests(), 0);
        assert_eq!(model.generation(), 0);

        // A later request is attempted again.
        assert!(model.request_tile(&k).unwrap());
        assert_eq!(model.loads_submitted(), 2);
        model.finish_pending().unwrap();
    }

    #[test]
    fn test_request_out_of_range_level() {
        let (_dir, model) = model();
        assert!(matches!(
            model.request_tile(&key(7, 0, 0)),
            Err(Error::LevelOutOfRange { .. })
        ));
        assert_eq!(model.pending_requests(), 0);

        let sector = Sector::from_degrees(0.0, 10.0, 0.0, 10.0);
        assert!(matches!(
            model.get_elevations(&sector, 3),
            Err(Error::LevelOutOfRange { .. })
        ));
    }

    #[test]
    fn test_get_elevations_falls_back_then_completes() {
        let (_dir, model) = model();
        write_level_zero(&model, 100);
        write_tile(&model, &key(1, 2, 4), 200);
        model.load_all_level_zero_tiles().unwrap();

        let sector = Sector::from_degrees(10.0, 20.0, 10.0, 20.0);
        let first = model.get_elevations(&sector, 1).unwrap();
        // The level-1 tile was only just requested, so the parent stands in.
        assert!(!first.is_complete());
        assert_eq!(first.finest_level(), Some(0));
        assert_eq!(model.pending_requests(), 1);
        let e = first.elevation(Angle::from_degrees(15.0), Angle::from_degrees(15.0));
        assert!((e - 100.0).abs() < 1e-9);

        model.finish_pending().unwrap();
        let second = model.get_elevations(&sector, 1).unwrap();
        assert!(second.is_complete());
        assert_eq!(second.len(), 1);
        let e = second.elevation(Angle::from_degrees(15.0), Angle::from_degrees(15.0));
        assert!((e - 200.0).abs() < 1e-9);

        // The first snapshot is unaffected.
        assert_eq!(first.finest_level(), Some(0));
    }

    #[test]
    fn test_get_elevations_outside_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.set_value(keys::SECTOR, "0 45 0 45");
        cfg.set_value(keys::TILE_ORIGIN, "0,0");
        let model = ElevationModel::from_config(&cfg).unwrap();

        let far_away = Sector::from_degrees(-60.0, -50.0, -60.0, -50.0);
        let elevations = model.get_elevations(&far_away, 0).unwrap();
        assert!(elevations.is_empty());
        assert!(elevations.is_complete());
        assert_eq!(model.pending_requests(), 0);
    }

    #[test]
    fn test_point_queries() {
        let (_dir, model) = model();
        let lat = Angle::from_degrees(30.0);
        let lon = Angle::from_degrees(30.0);

        // Nothing resident: the extreme floor, and a level-zero request.
        assert!((model.unmapped_elevation(lat, lon) - -400.0).abs() < 1e-9);
        assert_eq!(model.pending_requests(), 1);
        model.finish_pending().unwrap();

        write_level_zero(&model, 100);
        model.load_all_level_zero_tiles().unwrap();
        assert!((model.elevation(lat, lon) - 100.0).abs() < 1e-9);

        // Outside the data: the signal, replaced by `elevation`.
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.set_value(keys::SECTOR, "0 45 0 45");
        let partial = ElevationModel::from_config(&cfg).unwrap();
        let south = Angle::from_degrees(-30.0);
        assert!((partial.unmapped_elevation(south, lon) - DEFAULT_MISSING_DATA_SIGNAL).abs() < 1e-9);
        assert!((partial.elevation(south, lon) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_data_is_replaced_only_by_elevation() {
        let (_dir, model) = model();
        write_level_zero(&model, -32768);
        model.load_all_level_zero_tiles().unwrap();

        let lat = Angle::from_degrees(-20.0);
        let lon = Angle::from_degrees(100.0);
        assert!((model.unmapped_elevation(lat, lon) - DEFAULT_MISSING_DATA_SIGNAL).abs() < 1e-9);
        assert!((model.elevation(lat, lon) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_query_uses_finest_resident_tile() {
        let (_dir, model) = model();
        write_level_zero(&model, 100);
        write_tile(&model, &key(1, 2, 4), 200);
        model.load_all_level_zero_tiles().unwrap();
        model.request_tile(&key(1, 2, 4)).unwrap();
        model.finish_pending().unwrap();

        let inside = model.elevation(Angle::from_degrees(10.0), Angle::from_degrees(10.0));
        assert!((inside - 200.0).abs() < 1e-9);
        let outside = model.elevation(Angle::from_degrees(60.0), Angle::from_degrees(60.0));
        assert!((outside - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_extremes_without_raster_use_global_bounds() {
        let (_dir, model) = model();
        let sector = Sector::from_degrees(0.0, 1.0, 0.0, 1.0);
        assert_eq!(model.extreme_elevations_in(&sector), (-400.0, 8000.0));
        assert_eq!(
            model.extreme_elevations_at(Angle::ZERO, Angle::ZERO),
            (-400.0, 8000.0)
        );
    }

    #[test]
    fn test_extremes_from_raster() {
        let dir = tempfile::tempdir().unwrap();
        let extremes_path = dir.path().join("extremes_0.bin");
        let bytes: Vec<u8> = (0u16..8)
            .flat_map(|i| {
                let lo = i * 10;
                let hi = i * 100 + 50;
                lo.to_be_bytes().into_iter().chain(hi.to_be_bytes())
            })
            .collect();
        std::fs::write(&extremes_path, bytes).unwrap();

        let mut cfg = config(dir.path());
        cfg.set_value(keys::ELEVATION_EXTREMES_FILE, extremes_path.display());
        let model = ElevationModel::from_config(&cfg).unwrap();
        assert!(model.extremes().is_some());

        // Cell (1, 2) covers [0, 90] x [0, 90].
        let sector = Sector::from_degrees(10.0, 20.0, 10.0, 20.0);
        assert_eq!(model.extreme_elevations_in(&sector), (60.0, 650.0));
        assert_eq!(model.extreme_elevations_in(&sector), (60.0, 650.0));
        assert_eq!(
            model.extreme_elevations_at(Angle::from_degrees(-45.0), Angle::from_degrees(-135.0)),
            (0.0, 50.0)
        );
    }
}
