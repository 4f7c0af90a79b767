//! Point-in-time sets of resident tiles covering a region.

use std::sync::Arc;

use tessera_geo::{Angle, Sector};

use crate::tile::ElevationTile;

/// The tiles resident for a region when it was queried.
///
/// Holds its own references to the tiles, so later cache eviction does not
/// affect it. Tiles are ordered finest level first and lookups use the first
/// tile containing the location.
#[derive(Debug, Clone)]
pub struct Elevations {
    sector: Sector,
    target_level: usize,
    tiles: Vec<Arc<ElevationTile>>,
    complete: bool,
    missing_data_signal: f64,
    extremes: (f64, f64),
}

impl Elevations {
    pub(crate) fn new(
        sector: Sector,
        target_level: usize,
        mut tiles: Vec<Arc<ElevationTile>>,
        complete: bool,
        missing_data_signal: f64,
        extremes: (f64, f64),
    ) -> Self {
        tiles.sort_by(|a, b| b.key().level().cmp(&a.key().level()).then_with(|| a.key().cmp(b.key())));
        Self {
            sector,
            target_level,
            tiles,
            complete,
            missing_data_signal,
            extremes,
        }
    }

    /// The queried region, clipped to the model's coverage.
    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    #[must_use]
    pub fn target_level(&self) -> usize {
        self.target_level
    }

    /// Tiles in lookup order.
    #[must_use]
    pub fn tiles(&self) -> &[Arc<ElevationTile>] {
        &self.tiles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// True when every tile at the target level was resident.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// `(min, max)` elevation bounds for the region.
    #[must_use]
    pub fn extremes(&self) -> (f64, f64) {
        self.extremes
    }

    #[must_use]
    pub fn missing_data_signal(&self) -> f64 {
        self.missing_data_signal
    }

    /// Finest level among the held tiles.
    #[must_use]
    pub fn finest_level(&self) -> Option<usize> {
        self.tiles.first().map(|t| t.key().level())
    }

    /// Bilinear elevation from the finest tile containing the location,
    /// or the missing-data signal when no held tile covers it.
    #[must_use]
    pub fn elevation(&self, latitude: Angle, longitude: Angle) -> f64 {
        self.tiles
            .iter()
            .find(|tile| tile.sector().contains(latitude, longitude))
            .map_or(self.missing_data_signal, |tile| {
                tile.look_up_elevation(latitude, longitude)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{LevelSet, LevelSetParams};
    use crate::tile::{Tile, TileKey};
    use tessera_geo::LatLon;

    const MISSING: f64 = -32768.0;

    fn flat_tile(levels: &LevelSet, level: usize, row: i32, col: i32, value: f32) -> Arc<ElevationTile> {
        let key = TileKey::new(level, row, col, Arc::from("Earth/Test"));
        let tile = Tile::new(key, levels).unwrap();
        let count = tile.width() * tile.height();
        Arc::new(ElevationTile::from_samples(tile, vec![value; count], MISSING).unwrap())
    }

    fn levels() -> LevelSet {
        let mut params = LevelSetParams::new("Earth/Test", LatLon::from_degrees(90.0, 90.0), 3);
        params.tile_width = 4;
        params.tile_height = 4;
        LevelSet::new(&params).unwrap()
    }

    #[test]
    fn test_finest_tile_wins() {
        let levels = levels();
        let coarse = flat_tile(&levels, 0, 1, 2, 100.0);
        let fine = flat_tile(&levels, 1, 2, 4, 200.0);
        let elevations = Elevations::new(
            Sector::from_degrees(0.0, 90.0, 0.0, 90.0),
            1,
            vec![Arc::clone(&coarse), fine],
            false,
            MISSING,
            (0.0, 1000.0),
        );

        assert_eq!(elevations.finest_level(), Some(1));
        assert_eq!(elevations.len(), 2);
        // Level 1 tile (2, 4) spans [0, 45] x [0, 45].
        let e = elevations.elevation(Angle::from_degrees(10.0), Angle::from_degrees(10.0));
        assert!((e - 200.0).abs() < 1e-9);
        // Outside the fine tile only the coarse one applies.
        let e = elevations.elevation(Angle::from_degrees(60.0), Angle::from_degrees(60.0));
        assert!((e - 100.0).abs() < 1e-9);
        // Nothing covers the southern hemisphere.
        let e = elevations.elevation(Angle::from_degrees(-10.0), Angle::from_degrees(10.0));
        assert!((e - MISSING).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_keeps_tiles_alive() {
        let levels = levels();
        let tile = flat_tile(&levels, 0, 0, 0, 5.0);
        let elevations = Elevations::new(
            *tile.sector(),
            0,
            vec![Arc::clone(&tile)],
            true,
            MISSING,
            (0.0, 0.0),
        );
        drop(tile);
        assert!(elevations.is_complete());
        let e = elevations.elevation(Angle::from_degrees(-45.0), Angle::from_degrees(-135.0));
        assert!((e - 5.0).abs() < 1e-9);
    }
}
