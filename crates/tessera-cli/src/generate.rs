//! Synthetic elevation datasets for trying out the model without real data.

use std::path::{Path, PathBuf};

use tessera_elevation::{ElevationConfig, Error, LevelSet, LevelSetParams, Result, Tile, keys};
use tessera_geo::LatLon;

/// Store directory, relative to the dataset file.
const STORE_DIR: &str = "tiles";
const DATASET_FILE: &str = "dataset.json";

#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub cache_name: String,
    pub num_levels: usize,
    pub level_zero_delta: f64,
    pub tile_size: usize,
}

/// Smooth rolling terrain between roughly -5000 and 4000 metres.
fn synthetic_elevation(latitude: f64, longitude: f64) -> f64 {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    3000.0 * (3.0 * lat).sin() * (2.0 * lon).cos()
        + 1500.0 * (7.0 * lon + lat).sin() * lat.cos()
        - 500.0
}

/// Write every tile of a whole-globe pyramid plus its `dataset.json`.
///
/// Returns the path of the dataset file.
pub fn generate(out: &Path, layout: &SyntheticDataset) -> Result<PathBuf> {
    if layout.tile_size < 2 {
        return Err(Error::InvalidConfig {
            key: keys::TILE_WIDTH.to_string(),
            detail: format!("synthetic tiles need at least 2x2 samples, got {}", layout.tile_size),
        });
    }

    let mut params = LevelSetParams::new(
        layout.cache_name.clone(),
        LatLon::from_degrees(layout.level_zero_delta, layout.level_zero_delta),
        layout.num_levels,
    );
    params.tile_width = layout.tile_size;
    params.tile_height = layout.tile_size;
    let levels = LevelSet::new(&params)?;

    let store = out.join(STORE_DIR);
    let (mut lowest, mut highest) = (f64::MAX, f64::MIN);
    let mut written = 0usize;

    for level in levels.levels() {
        let tile_keys = levels.tile_keys_in(levels.sector(), level);
        let count = tile_keys.len();
        for key in tile_keys {
            let path = store.join(level.tile_file(key.row(), key.col()));
            let tile = Tile::new(key, &levels)?;
            let sector = tile.sector();
            let lat_step = sector.delta_lat().degrees() / (tile.height() - 1) as f64;
            let lon_step = sector.delta_lon().degrees() / (tile.width() - 1) as f64;

            let mut bytes = Vec::with_capacity(tile.width() * tile.height() * 2);
            for row in 0..tile.height() {
                // Row 0 is the northern edge.
                let latitude = sector.max_latitude().degrees() - row as f64 * lat_step;
                for col in 0..tile.width() {
                    let longitude = sector.min_longitude().degrees() + col as f64 * lon_step;
                    let elevation = synthetic_elevation(latitude, longitude).round();
                    lowest = lowest.min(elevation);
                    highest = highest.max(elevation);
                    bytes.extend_from_slice(&(elevation as i16).to_le_bytes());
                }
            }

            write_file(&path, &bytes)?;
        }
        written += count;
        tracing::info!(level = level.level_number(), tiles = count, "wrote level");
    }

    let config = ElevationConfig::from_pairs([
        (keys::NUM_LEVELS, layout.num_levels.to_string()),
        (
            keys::LEVEL_ZERO_TILE_DELTA,
            format!("{},{}", layout.level_zero_delta, layout.level_zero_delta),
        ),
        (keys::TILE_WIDTH, layout.tile_size.to_string()),
        (keys::TILE_HEIGHT, layout.tile_size.to_string()),
        (keys::DATA_CACHE_NAME, layout.cache_name.clone()),
        (keys::FORMAT_SUFFIX, params.format_suffix.clone()),
        (keys::DATA_TYPE, "Int16".to_string()),
        (keys::BYTE_ORDER, "LittleEndian".to_string()),
        (keys::MODEL_STORE_PATH, STORE_DIR.to_string()),
        (keys::ELEVATION_MIN, lowest.to_string()),
        (keys::ELEVATION_MAX, highest.to_string()),
    ]);
    let dataset = out.join(DATASET_FILE);
    config.save(&dataset)?;

    tracing::info!(path = %dataset.display(), tiles = written, "generated dataset");
    Ok(dataset)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, bytes).map_err(io_error)
}
