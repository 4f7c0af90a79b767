//! Tile addressing and decoded elevation tiles.

use std::fmt;
use std::sync::Arc;

use tessera_geo::{Angle, Sector};

use crate::cache::Cacheable;
use crate::error::Result;
use crate::level::{Level, LevelSet};

/// Row of the tile containing `latitude`.
///
/// A latitude on the top edge of the pyramid (`max_latitude`) belongs to the
/// last row rather than one past it.
#[must_use]
pub fn compute_row(delta: Angle, latitude: Angle, origin: Angle, max_latitude: Angle) -> i32 {
    let last_row = ((max_latitude.degrees() - origin.degrees()) / delta.degrees()).ceil() as i32 - 1;
    let row = ((latitude.degrees() - origin.degrees()) / delta.degrees()).floor() as i32;
    row.min(last_row.max(0))
}

/// Column of the tile containing `longitude`.
///
/// The offset from the origin is wrapped into [0, 360) so longitudes on either
/// side of the antimeridian address the same grid; exactly origin + 360 maps
/// to the last column.
#[must_use]
pub fn compute_column(delta: Angle, longitude: Angle, origin: Angle) -> i32 {
    let last_col = (360.0 / delta.degrees()).ceil() as i32 - 1;
    let offset = longitude.degrees() - origin.degrees();
    if (offset - 360.0).abs() < 1e-9 {
        return last_col;
    }
    let col = (offset.rem_euclid(360.0) / delta.degrees()).floor() as i32;
    col.min(last_col)
}

/// Identity of a tile: level, row, column and dataset.
///
/// Used both as the cache key and as the in-flight request key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    level: usize,
    row: i32,
    col: i32,
    cache_name: Arc<str>,
}

impl TileKey {
    #[must_use]
    pub fn new(level: usize, row: i32, col: i32, cache_name: Arc<str>) -> Self {
        Self {
            level,
            row,
            col,
            cache_name,
        }
    }

    /// Key of the tile at `level` containing the given location.
    #[must_use]
    pub fn from_lat_lon(latitude: Angle, longitude: Angle, levels: &LevelSet, level: &Level) -> Self {
        let delta = level.tile_delta();
        let origin = levels.tile_origin();
        let row = compute_row(
            delta.latitude,
            latitude,
            origin.latitude,
            levels.sector().max_latitude(),
        );
        let col = compute_column(delta.longitude, longitude, origin.longitude);
        Self::new(level.level_number(), row, col, Arc::clone(level.cache_name()))
    }

    /// The quadtree parent, or `None` at level zero.
    #[must_use]
    pub fn parent(&self) -> Option<TileKey> {
        let level = self.level.checked_sub(1)?;
        Some(Self::new(
            level,
            self.row.div_euclid(2),
            self.col.div_euclid(2),
            Arc::clone(&self.cache_name),
        ))
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn row(&self) -> i32 {
        self.row
    }

    #[must_use]
    pub fn col(&self) -> i32 {
        self.col
    }

    #[must_use]
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.cache_name, self.level, self.row, self.col
        )
    }
}

/// A tile's address together with its geographic extent and raster size.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    key: TileKey,
    sector: Sector,
    width: usize,
    height: usize,
}

impl Tile {
    pub fn new(key: TileKey, levels: &LevelSet) -> Result<Self> {
        let level = levels.level(key.level())?;
        Ok(Self {
            sector: Self::sector_for(&key, levels)?,
            width: level.tile_width(),
            height: level.tile_height(),
            key,
        })
    }

    /// The sector covered by `key`: `origin + row * delta` on each axis.
    pub fn sector_for(key: &TileKey, levels: &LevelSet) -> Result<Sector> {
        let delta = levels.level(key.level())?.tile_delta();
        let origin = levels.tile_origin();
        let min_lat = origin.latitude.degrees() + f64::from(key.row()) * delta.latitude.degrees();
        let min_lon = origin.longitude.degrees() + f64::from(key.col()) * delta.longitude.degrees();
        Ok(Sector::from_degrees(
            min_lat,
            min_lat + delta.latitude.degrees(),
            min_lon,
            min_lon + delta.longitude.degrees(),
        ))
    }

    #[must_use]
    pub fn key(&self) -> &TileKey {
        &self.key
    }

    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.key.level()
    }
}

/// A decoded elevation raster.
///
/// Samples are row-major with row 0 on the northern edge, written once at
/// decode and read-only afterwards.
#[derive(Debug)]
pub struct ElevationTile {
    tile: Tile,
    elevations: Box<[f32]>,
    missing_data_signal: f32,
}

impl ElevationTile {
    /// Wrap decoded samples. Returns `None` unless there are exactly
    /// `width * height` of them.
    #[must_use]
    pub fn from_samples(tile: Tile, elevations: Vec<f32>, missing_data_signal: f64) -> Option<Self> {
        if elevations.len() != tile.width() * tile.height() {
            return None;
        }
        Some(Self {
            tile,
            elevations: elevations.into_boxed_slice(),
            missing_data_signal: missing_data_signal as f32,
        })
    }

    #[must_use]
    pub fn tile(&self) -> &Tile {
        &self.tile
    }

    #[must_use]
    pub fn key(&self) -> &TileKey {
        self.tile.key()
    }

    #[must_use]
    pub fn sector(&self) -> &Sector {
        self.tile.sector()
    }

    #[must_use]
    pub fn elevations(&self) -> &[f32] {
        &self.elevations
    }

    #[must_use]
    pub fn missing_data_signal(&self) -> f64 {
        f64::from(self.missing_data_signal)
    }

    /// Bilinearly interpolated elevation at a location inside the tile.
    ///
    /// Locations outside the tile are clamped to its edges. If any of the
    /// four surrounding samples is the missing-data signal the result is the
    /// signal itself.
    #[must_use]
    pub fn look_up_elevation(&self, latitude: Angle, longitude: Angle) -> f64 {
        let width = self.tile.width();
        let height = self.tile.height();
        let sector = self.tile.sector();

        let s_lat = ((sector.max_latitude().degrees() - latitude.degrees())
            / sector.delta_lat().degrees())
        .clamp(0.0, 1.0);
        let s_lon = ((longitude.degrees() - sector.min_longitude().degrees())
            / sector.delta_lon().degrees())
        .clamp(0.0, 1.0);

        let row_pos = s_lat * (height.saturating_sub(1)) as f64;
        let col_pos = s_lon * (width.saturating_sub(1)) as f64;
        let row = (row_pos.floor() as usize).min(height.saturating_sub(2));
        let col = (col_pos.floor() as usize).min(width.saturating_sub(2));
        let next_row = (row + 1).min(height.saturating_sub(1));
        let next_col = (col + 1).min(width.saturating_sub(1));
        let row_frac = row_pos - row as f64;
        let col_frac = col_pos - col as f64;

        let at = |r: usize, c: usize| self.elevations[r * width + c];
        let corners = [
            at(row, col),
            at(row, next_col),
            at(next_row, col),
            at(next_row, next_col),
        ];
        if corners.contains(&self.missing_data_signal) {
            return f64::from(self.missing_data_signal);
        }

        let [nw, ne, sw, se] = corners.map(f64::from);
        let north = nw + col_frac * (ne - nw);
        let south = sw + col_frac * (se - sw);
        north + row_frac * (south - north)
    }
}

impl Cacheable for ElevationTile {
    fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.elevations.len() * std::mem::size_of::<f32>()
    }
}
