//! Coarse per-cell minimum/maximum elevations.

use std::path::{Path, PathBuf};

use tessera_geo::{Angle, Sector};

use crate::error::{Error, Result};
use crate::level::LevelSet;
use crate::tile::{compute_column, compute_row};

/// A raster of `(min, max)` elevation pairs laid on one level's tile grid.
///
/// Cell `(row, col)` covers the same sector as tile `(row, col)` at that
/// level. Rows count up from the tile origin.
#[derive(Debug, Clone)]
pub struct ExtremeElevations {
    level: usize,
    num_rows: i32,
    num_cols: i32,
    delta_lat: Angle,
    delta_lon: Angle,
    origin_lat: Angle,
    origin_lon: Angle,
    max_latitude: Angle,
    cells: Vec<(f64, f64)>,
}

impl ExtremeElevations {
    /// Read a raster of big-endian `u16` pairs.
    ///
    /// The level is taken from the file name, which must end in `_<level>`
    /// before the extension (`extremes_5.bin`).
    pub fn load(path: &Path, levels: &LevelSet) -> Result<Self> {
        let level = level_from_file_name(path).ok_or_else(|| Error::ExtremesFile {
            path: path.to_path_buf(),
            detail: "file name does not end in _<level>".to_string(),
        })?;
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extremes = Self::from_bytes(&bytes, level, levels).map_err(|e| match e {
            Error::ExtremesFile { detail, .. } => Error::ExtremesFile {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })?;
        tracing::info!(
            path = %path.display(),
            level,
            cells = extremes.cells.len(),
            "loaded extreme elevations"
        );
        Ok(extremes)
    }

    /// Decode a raster for `level` from big-endian `u16` `(min, max)` pairs.
    pub fn from_bytes(bytes: &[u8], level: usize, levels: &LevelSet) -> Result<Self> {
        let grid = levels.level(level)?;
        let num_rows = grid.num_rows(levels.sector(), levels.tile_origin());
        let num_cols = grid.num_cols(levels.sector(), levels.tile_origin());
        let expected = num_rows as usize * num_cols as usize * 4;
        if bytes.len() != expected {
            return Err(Error::ExtremesFile {
                path: PathBuf::new(),
                detail: format!(
                    "expected {expected} bytes for {num_rows}x{num_cols} cells, found {}",
                    bytes.len()
                ),
            });
        }

        let cells = bytes
            .chunks_exact(4)
            .map(|c| {
                let a = f64::from(u16::from_be_bytes([c[0], c[1]]));
                let b = f64::from(u16::from_be_bytes([c[2], c[3]]));
                (a.min(b), a.max(b))
            })
            .collect();

        let delta = grid.tile_delta();
        let origin = levels.tile_origin();
        Ok(Self {
            level,
            num_rows,
            num_cols,
            delta_lat: delta.latitude,
            delta_lon: delta.longitude,
            origin_lat: origin.latitude,
            origin_lon: origin.longitude,
            max_latitude: levels.sector().max_latitude(),
            cells,
        })
    }

    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    /// Extremes of the cell containing a location.
    #[must_use]
    pub fn at(&self, latitude: Angle, longitude: Angle) -> (f64, f64) {
        let row = self.row(latitude);
        let col = self.col(longitude);
        self.cell(row, col)
    }

    /// Extremes over every cell intersecting `sector`.
    #[must_use]
    pub fn in_sector(&self, sector: &Sector) -> (f64, f64) {
        let first_row = self.row(sector.min_latitude());
        let last_row = self.row(sector.max_latitude());
        let first_col = self.col(sector.min_longitude());
        let last_col = self.col(sector.max_longitude());

        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for row in first_row.min(last_row)..=first_row.max(last_row) {
            for col in first_col.min(last_col)..=first_col.max(last_col) {
                let (lo, hi) = self.cell(row, col);
                min = min.min(lo);
                max = max.max(hi);
            }
        }
        (min, max)
    }

    fn row(&self, latitude: Angle) -> i32 {
        compute_row(self.delta_lat, latitude, self.origin_lat, self.max_latitude)
            .clamp(0, self.num_rows - 1)
    }

    fn col(&self, longitude: Angle) -> i32 {
        compute_column(self.delta_lon, longitude, self.origin_lon).clamp(0, self.num_cols - 1)
    }

    fn cell(&self, row: i32, col: i32) -> (f64, f64) {
        self.cells[row as usize * self.num_cols as usize + col as usize]
    }
}

fn level_from_file_name(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('_')?;
    suffix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LevelSetParams;
    use tessera_geo::LatLon;

    /// A whole-globe pyramid whose level 0 is a 2x4 grid of 90 degree cells.
    fn levels() -> LevelSet {
        let params = LevelSetParams::new("Earth/Test", LatLon::from_degrees(90.0, 90.0), 3);
        LevelSet::new(&params).unwrap()
    }

    fn encode(cells: &[(u16, u16)]) -> Vec<u8> {
        cells
            .iter()
            .flat_map(|(lo, hi)| lo.to_be_bytes().into_iter().chain(hi.to_be_bytes()))
            .collect()
    }

    fn sample_cells() -> Vec<(u16, u16)> {
        // Southern row first.
        vec![
            (0, 100),
            (10, 200),
            (20, 300),
            (30, 400),
            (1, 1000),
            (2, 2000),
            (3, 3000),
            (4, 4000),
        ]
    }

    #[test]
    fn test_lookup_at_location() {
        let extremes = ExtremeElevations::from_bytes(&encode(&sample_cells()), 0, &levels()).unwrap();
        let at = |lat: f64, lon: f64| extremes.at(Angle::from_degrees(lat), Angle::from_degrees(lon));

        assert_eq!(at(-45.0, -135.0), (0.0, 100.0));
        assert_eq!(at(-45.0, 135.0), (30.0, 400.0));
        assert_eq!(at(45.0, -45.0), (2.0, 2000.0));
        // Top and east edges stay inside the grid.
        assert_eq!(at(90.0, 180.0), (4.0, 4000.0));
    }

    #[test]
    fn test_extremes_over_sector() {
        let extremes = ExtremeElevations::from_bytes(&encode(&sample_cells()), 0, &levels()).unwrap();
        let sector = Sector::from_degrees(-10.0, 10.0, -100.0, 10.0);
        // Covers columns 0..=2 in both rows.
        assert_eq!(extremes.in_sector(&sector), (0.0, 3000.0));

        let single = Sector::from_degrees(10.0, 20.0, 100.0, 110.0);
        assert_eq!(extremes.in_sector(&single), (4.0, 4000.0));
    }

    #[test]
    fn test_wrong_size_is_rejected() {
        let bytes = encode(&sample_cells()[..7]);
        assert!(matches!(
            ExtremeElevations::from_bytes(&bytes, 0, &levels()),
            Err(Error::ExtremesFile { .. })
        ));
    }

    #[test]
    fn test_load_reads_level_from_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let levels = levels();

        // Level 1 is a 4x8 grid.
        let cells: Vec<(u16, u16)> = (0..32).map(|i| (i, i * 10)).collect();
        let path = dir.path().join("srtm_extremes_1.bin");
        std::fs::write(&path, encode(&cells)).unwrap();

        let extremes = ExtremeElevations::load(&path, &levels).unwrap();
        assert_eq!(extremes.level(), 1);
        assert_eq!(
            extremes.at(Angle::from_degrees(-89.0), Angle::from_degrees(-179.0)),
            (0.0, 0.0)
        );

        let unnamed = dir.path().join("extremes.bin");
        std::fs::write(&unnamed, encode(&cells)).unwrap();
        assert!(matches!(
            ExtremeElevations::load(&unnamed, &levels),
            Err(Error::ExtremesFile { .. })
        ));
    }
}
