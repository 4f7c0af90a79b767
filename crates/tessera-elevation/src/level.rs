//! The resolution pyramid: per-level tile geometry and level selection.

use std::path::PathBuf;
use std::sync::Arc;

use tessera_geo::{Angle, LatLon, Sector};

use crate::config::{ElevationConfig, keys};
use crate::error::{Error, Result};
use crate::tile::{TileKey, compute_column, compute_row};

/// One resolution level of a tiled raster pyramid.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    level_number: usize,
    level_name: String,
    tile_width: usize,
    tile_height: usize,
    tile_delta: LatLon,
    texel_size: f64,
    cache_name: Arc<str>,
    path: String,
    format_suffix: String,
}

impl Level {
    /// Build a level from shared pyramid parameters.
    #[must_use]
    pub fn new(level_number: usize, tile_delta: LatLon, params: &LevelSetParams) -> Self {
        Self::assemble(
            level_number,
            level_number.to_string(),
            params.tile_width,
            params.tile_height,
            tile_delta,
            Arc::from(params.cache_name.as_str()),
            params.format_suffix.clone(),
        )
    }

    /// Build a level from a per-level configuration view.
    ///
    /// Reads `LEVEL_NUMBER`, `LEVEL_NAME` (defaults to the number),
    /// `TILE_WIDTH`, `TILE_HEIGHT`, `TILE_DELTA`, `DATA_CACHE_NAME` and
    /// `FORMAT_SUFFIX` (defaults to `.bil`).
    pub fn from_config(config: &ElevationConfig) -> Result<Self> {
        let level_number: usize = config.get_value(keys::LEVEL_NUMBER)?;
        let level_name: String = config.get_or(keys::LEVEL_NAME, level_number.to_string())?;
        let tile_width: usize = config.get_value(keys::TILE_WIDTH)?;
        let tile_height: usize = config.get_value(keys::TILE_HEIGHT)?;
        let tile_delta: LatLon = config.get_value(keys::TILE_DELTA)?;
        let cache_name: String = config.get_value(keys::DATA_CACHE_NAME)?;
        let format_suffix: String = config.get_or(keys::FORMAT_SUFFIX, ".bil".to_string())?;

        if tile_width == 0 || tile_height == 0 {
            return Err(Error::InvalidConfig {
                key: keys::TILE_WIDTH.to_string(),
                detail: format!("tile size {tile_width}x{tile_height} is empty"),
            });
        }
        if tile_delta.latitude.degrees() <= 0.0 || tile_delta.longitude.degrees() <= 0.0 {
            return Err(Error::InvalidConfig {
                key: keys::TILE_DELTA.to_string(),
                detail: format!("tile delta {tile_delta} must be positive"),
            });
        }

        Ok(Self::assemble(
            level_number,
            level_name,
            tile_width,
            tile_height,
            tile_delta,
            Arc::from(cache_name.as_str()),
            format_suffix,
        ))
    }

    fn assemble(
        level_number: usize,
        level_name: String,
        tile_width: usize,
        tile_height: usize,
        tile_delta: LatLon,
        cache_name: Arc<str>,
        format_suffix: String,
    ) -> Self {
        let path = format!("{cache_name}/{level_name}");
        Self {
            level_number,
            level_name,
            tile_width,
            tile_height,
            texel_size: tile_delta.latitude.radians() / tile_height as f64,
            tile_delta,
            cache_name,
            path,
            format_suffix,
        }
    }

    #[must_use]
    pub fn level_number(&self) -> usize {
        self.level_number
    }

    #[must_use]
    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    #[must_use]
    pub fn tile_width(&self) -> usize {
        self.tile_width
    }

    #[must_use]
    pub fn tile_height(&self) -> usize {
        self.tile_height
    }

    #[must_use]
    pub fn tile_delta(&self) -> LatLon {
        self.tile_delta
    }

    /// Angular size of one sample, in radians of latitude.
    #[must_use]
    pub fn texel_size(&self) -> f64 {
        self.texel_size
    }

    #[must_use]
    pub fn cache_name(&self) -> &Arc<str> {
        &self.cache_name
    }

    /// Storage path relative to the model store, `<cache name>/<level name>`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn format_suffix(&self) -> &str {
        &self.format_suffix
    }

    /// File of tile `(row, col)` relative to the model store:
    /// `<path>/<row>/<row>_<col><suffix>`.
    #[must_use]
    pub fn tile_file(&self, row: i32, col: i32) -> PathBuf {
        PathBuf::from(&self.path)
            .join(row.to_string())
            .join(format!("{row}_{col}{}", self.format_suffix))
    }

    /// Number of tile rows between `origin` and the top of `sector`.
    #[must_use]
    pub fn num_rows(&self, sector: &Sector, origin: LatLon) -> i32 {
        let span = sector.max_latitude().degrees() - origin.latitude.degrees();
        (span / self.tile_delta.latitude.degrees()).ceil().max(1.0) as i32
    }

    /// Number of tile columns between `origin` and the east edge of `sector`.
    #[must_use]
    pub fn num_cols(&self, sector: &Sector, origin: LatLon) -> i32 {
        let span = sector.max_longitude().degrees() - origin.longitude.degrees();
        (span / self.tile_delta.longitude.degrees()).ceil().max(1.0) as i32
    }
}

/// Parameters shared by every level of a pyramid.
#[derive(Debug, Clone)]
pub struct LevelSetParams {
    pub sector: Sector,
    pub tile_origin: LatLon,
    pub level_zero_tile_delta: LatLon,
    pub num_levels: usize,
    pub tile_width: usize,
    pub tile_height: usize,
    pub cache_name: String,
    pub format_suffix: String,
}

impl LevelSetParams {
    /// Whole-globe pyramid of 150x150 `.bil` tiles anchored at (-90, -180).
    #[must_use]
    pub fn new(cache_name: impl Into<String>, level_zero_tile_delta: LatLon, num_levels: usize) -> Self {
        Self {
            sector: Sector::full_sphere(),
            tile_origin: LatLon::from_degrees(-90.0, -180.0),
            level_zero_tile_delta,
            num_levels,
            tile_width: 150,
            tile_height: 150,
            cache_name: cache_name.into(),
            format_suffix: ".bil".to_string(),
        }
    }
}

/// An ordered pyramid of levels, coarsest first.
///
/// Non-empty, and texel size strictly decreases with level number.
#[derive(Debug, Clone)]
pub struct LevelSet {
    sector: Sector,
    tile_origin: LatLon,
    level_zero_tile_delta: LatLon,
    levels: Vec<Level>,
}

impl LevelSet {
    /// Build a pyramid whose level `i` tile delta is the level-zero delta / 2^i.
    pub fn new(params: &LevelSetParams) -> Result<Self> {
        let levels = (0..params.num_levels)
            .map(|i| Level::new(i, halved_delta(params.level_zero_tile_delta, i), params))
            .collect();
        Self::from_levels(params.sector, params.tile_origin, levels)
    }

    /// Build a pyramid from configuration.
    ///
    /// Reads `NUM_LEVELS`, `LEVEL_ZERO_TILE_DELTA`, `SECTOR` (defaults to the
    /// whole sphere) and `TILE_ORIGIN` (defaults to -90,-180), then builds each
    /// level from a copy of `config` with `LEVEL_NUMBER`, `LEVEL_NAME` and
    /// `TILE_DELTA` filled in.
    pub fn from_config(config: &ElevationConfig) -> Result<Self> {
        let sector: Sector = config.get_or(keys::SECTOR, Sector::full_sphere())?;
        let tile_origin: LatLon =
            config.get_or(keys::TILE_ORIGIN, LatLon::from_degrees(-90.0, -180.0))?;
        let level_zero_tile_delta: LatLon = config.get_value(keys::LEVEL_ZERO_TILE_DELTA)?;
        let num_levels: usize = config.get_value(keys::NUM_LEVELS)?;

        let mut levels = Vec::with_capacity(num_levels);
        for i in 0..num_levels {
            let delta = halved_delta(level_zero_tile_delta, i);
            let mut level_config = config.clone();
            level_config.set_value(keys::LEVEL_NUMBER, i);
            level_config.set_value(keys::LEVEL_NAME, i);
            level_config.set_value(
                keys::TILE_DELTA,
                format!("{},{}", delta.latitude.degrees(), delta.longitude.degrees()),
            );
            levels.push(Level::from_config(&level_config)?);
        }

        let level_set = Self::from_levels(sector, tile_origin, levels)?;
        tracing::debug!(
            num_levels,
            sector = %level_set.sector,
            best_texel = level_set.last_level().texel_size(),
            "built level set"
        );
        Ok(level_set)
    }

    /// Assemble a pyramid from explicit levels, checking its invariants.
    pub fn from_levels(sector: Sector, tile_origin: LatLon, levels: Vec<Level>) -> Result<Self> {
        let Some(first) = levels.first() else {
            return Err(Error::InvalidConfig {
                key: keys::NUM_LEVELS.to_string(),
                detail: "a level set needs at least one level".to_string(),
            });
        };
        let level_zero_tile_delta = first.tile_delta();

        for (i, level) in levels.iter().enumerate() {
            if level.level_number() != i {
                return Err(Error::InvalidConfig {
                    key: keys::LEVEL_NUMBER.to_string(),
                    detail: format!("level at index {i} is numbered {}", level.level_number()),
                });
            }
        }
        for pair in levels.windows(2) {
            if pair[1].texel_size() >= pair[0].texel_size() {
                return Err(Error::InvalidConfig {
                    key: keys::TILE_DELTA.to_string(),
                    detail: format!(
                        "level {} is not finer than level {}",
                        pair[1].level_number(),
                        pair[0].level_number()
                    ),
                });
            }
        }

        Ok(Self {
            sector,
            tile_origin,
            level_zero_tile_delta,
            levels,
        })
    }

    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    #[must_use]
    pub fn tile_origin(&self) -> LatLon {
        self.tile_origin
    }

    #[must_use]
    pub fn level_zero_tile_delta(&self) -> LatLon {
        self.level_zero_tile_delta
    }

    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, level_number: usize) -> Result<&Level> {
        self.levels
            .get(level_number)
            .ok_or(Error::LevelOutOfRange {
                level: level_number,
                num_levels: self.levels.len(),
            })
    }

    #[must_use]
    pub fn first_level(&self) -> &Level {
        &self.levels[0]
    }

    #[must_use]
    pub fn last_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    /// The coarsest level whose texel size is at most `texel_size`,
    /// or the finest level when none is fine enough.
    #[must_use]
    pub fn target_level(&self, texel_size: f64) -> &Level {
        self.levels
            .iter()
            .find(|level| level.texel_size() <= texel_size)
            .unwrap_or_else(|| self.last_level())
    }

    /// Keys of every tile at `level` that covers part of `sector`.
    ///
    /// The query is clipped to the pyramid's sector first; tiles are listed
    /// row by row from the south-west.
    #[must_use]
    pub fn tile_keys_in(&self, sector: &Sector, level: &Level) -> Vec<TileKey> {
        let Some(region) = sector.intersection(&self.sector) else {
            return Vec::new();
        };
        let delta = level.tile_delta();
        let origin = self.tile_origin;
        let top = self.sector.max_latitude();

        let first_row = compute_row(delta.latitude, region.min_latitude(), origin.latitude, top);
        let last_row = compute_row(delta.latitude, region.max_latitude(), origin.latitude, top);
        let first_col = compute_column(delta.longitude, region.min_longitude(), origin.longitude);
        let last_col = compute_column(delta.longitude, region.max_longitude(), origin.longitude);

        let mut keys = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                keys.push(TileKey::new(
                    level.level_number(),
                    row,
                    col,
                    Arc::clone(level.cache_name()),
                ));
            }
        }
        keys
    }

    /// Keys of every level-zero tile covering the pyramid's sector.
    #[must_use]
    pub fn level_zero_keys(&self) -> Vec<TileKey> {
        self.tile_keys_in(&self.sector, self.first_level())
    }
}

fn halved_delta(level_zero: LatLon, level: usize) -> LatLon {
    let divisor = f64::from(1u32 << level.min(31));
    LatLon::new(
        Angle::from_degrees(level_zero.latitude.degrees() / divisor),
        Angle::from_degrees(level_zero.longitude.degrees() / divisor),
    )
}
