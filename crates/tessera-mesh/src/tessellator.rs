//! Adaptive quadtree tessellation of the globe.

use std::sync::Arc;

use glam::DVec3;
use tessera_elevation::{ElevationModel, Error, Result};
use tessera_geo::{Angle, Ellipsoid, Sector};

use crate::frustum::Frustum;
use crate::geometry::{SharedGeometry, build_render_info};
use crate::rect_tile::RectTile;
use crate::render_info::RenderInfo;

/// Fraction of the eye distance a grid cell may span before its tile splits,
/// at a 90 degree field of view.
pub const DEFAULT_DETAIL_SCALE: f64 = 0.05;
/// Grid cells per tile side.
pub const DEFAULT_DENSITY: usize = 20;
/// Default byte budget of the mesh cache.
pub const DEFAULT_RENDER_INFO_CAPACITY: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellatorSettings {
    /// Grid cells per tile side.
    pub density: usize,
    /// Top-level tiles along a meridian.
    pub num_lat: usize,
    /// Top-level tiles along the equator.
    pub num_lon: usize,
    pub detail_scale: f64,
    /// Deepest quadtree level ever produced, whatever the data supports.
    pub max_level_cap: usize,
    pub render_info_capacity: usize,
    pub ellipsoid: Ellipsoid,
}

impl Default for TessellatorSettings {
    fn default() -> Self {
        Self {
            density: DEFAULT_DENSITY,
            num_lat: 3,
            num_lon: 3,
            detail_scale: DEFAULT_DETAIL_SCALE,
            max_level_cap: 24,
            render_info_capacity: DEFAULT_RENDER_INFO_CAPACITY,
            ellipsoid: Ellipsoid::WGS84,
        }
    }
}

/// Counters for the most recent [`RectangularTessellator::tessellate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TessellationStats {
    /// Elevation tiles that became resident at the start of the frame.
    pub tiles_landed: usize,
    pub tiles_visited: usize,
    pub tiles_culled: usize,
    pub tiles_current: usize,
    pub meshes_built: usize,
    pub meshes_reused: usize,
}

/// Screen-space detail test for one frame.
#[derive(Debug, Clone, Copy)]
struct DetailMetrics {
    eye: DVec3,
    /// Cell size allowed per metre of eye distance.
    cell_per_distance: f64,
}

impl DetailMetrics {
    fn new(eye: DVec3, field_of_view: Angle, detail_scale: f64, detail_hint: f64) -> Self {
        Self {
            eye,
            cell_per_distance: field_of_view.tan_half_angle()
                * detail_scale
                * 10f64.powf(-detail_hint),
        }
    }

    /// True when a cell of `cell_size` metres centred near `center` is too
    /// coarse for its distance from the eye.
    fn should_split(&self, center: DVec3, cell_size: f64) -> bool {
        let distance = self.eye.distance(center);
        if distance <= 0.0 {
            return true;
        }
        cell_size > distance * self.cell_per_distance
    }
}

/// Selects and meshes the terrain tiles visible from a viewpoint.
///
/// The globe is divided into `num_lat × num_lon` top-level tiles. Each frame
/// every tile is culled against the view frustum, then either kept as
/// current or split into its four quadrants until its grid cells are small
/// enough for their distance from the eye, or it reaches the finest level
/// the elevation data supports.
///
/// Meshes are cached per sector and rebuilt only when they were built from
/// incomplete elevations and the model has gained tiles since.
#[derive(Debug)]
pub struct RectangularTessellator {
    model: Arc<ElevationModel>,
    settings: TessellatorSettings,
    top_level: Vec<Sector>,
    max_level: usize,
    geometry: SharedGeometry,
    current: Vec<RectTile>,
    stats: TessellationStats,
}

impl RectangularTessellator {
    /// Create a tessellator over `model`.
    ///
    /// Fails with [`Error::InvalidConfig`] when the density or the top-level
    /// grid is empty.
    pub fn new(model: Arc<ElevationModel>, settings: TessellatorSettings) -> Result<Self> {
        for (key, value) in [
            ("density", settings.density),
            ("num_lat", settings.num_lat),
            ("num_lon", settings.num_lon),
        ] {
            if value == 0 {
                return Err(Error::InvalidConfig {
                    key: key.to_string(),
                    detail: "must be at least 1".to_string(),
                });
            }
        }

        let top_level = top_level_sectors(settings.num_lat, settings.num_lon);
        let max_level = finest_supported_level(&model, &settings);

        tracing::info!(
            density = settings.density,
            top_level_tiles = top_level.len(),
            max_level,
            "created tessellator"
        );

        Ok(Self {
            model,
            geometry: SharedGeometry::new(settings.render_info_capacity),
            settings,
            top_level,
            max_level,
            current: Vec::new(),
            stats: TessellationStats::default(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &Arc<ElevationModel> {
        &self.model
    }

    #[must_use]
    pub fn settings(&self) -> &TessellatorSettings {
        &self.settings
    }

    /// Deepest quadtree level tiles are split to.
    #[must_use]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    #[must_use]
    pub fn top_level_sectors(&self) -> &[Sector] {
        &self.top_level
    }

    /// Tiles selected by the last frame, in traversal order.
    #[must_use]
    pub fn current_tiles(&self) -> &[RectTile] {
        &self.current
    }

    #[must_use]
    pub fn stats(&self) -> TessellationStats {
        self.stats
    }

    #[must_use]
    pub fn geometry(&self) -> &SharedGeometry {
        &self.geometry
    }

    /// Forget every cached mesh, buffer and bounding box.
    pub fn clear_caches(&mut self) {
        self.geometry.clear();
    }

    /// Select the visible tiles for a frame, building any missing meshes.
    ///
    /// Finished elevation loads are picked up first. Tiles come back in
    /// depth-first order: top-level tiles south to north, west to east, and
    /// children south-west, south-east, north-west, north-east.
    pub fn tessellate(
        &mut self,
        eye: DVec3,
        field_of_view: Angle,
        frustum: &Frustum,
    ) -> Result<&[RectTile]> {
        self.stats = TessellationStats {
            tiles_landed: self.model.poll(),
            ..TessellationStats::default()
        };
        self.current.clear();

        let metrics = DetailMetrics::new(
            eye,
            field_of_view,
            self.settings.detail_scale,
            self.model.detail_hint(),
        );

        let mut stack: Vec<(Sector, usize)> =
            self.top_level.iter().rev().map(|sector| (*sector, 0)).collect();
        while let Some((sector, level)) = stack.pop() {
            self.stats.tiles_visited += 1;

            let bounds =
                self.geometry
                    .bounding_box(&self.model, &self.settings.ellipsoid, &sector);
            if !frustum.intersects_box(&bounds) {
                self.stats.tiles_culled += 1;
                continue;
            }

            if level < self.max_level && self.needs_split(&metrics, &sector) {
                stack.extend(sector.subdivide().into_iter().rev().map(|child| (child, level + 1)));
                continue;
            }

            let info = self.render_info(&sector)?;
            self.current.push(RectTile::new(sector, level, bounds, info));
        }
        self.stats.tiles_current = self.current.len();

        tracing::debug!(
            tiles = self.stats.tiles_current,
            culled = self.stats.tiles_culled,
            built = self.stats.meshes_built,
            landed = self.stats.tiles_landed,
            "tessellated"
        );
        Ok(self.current.as_slice())
    }

    /// Mesh for `sector` at the configured density, from the cache when it
    /// is still good.
    pub fn render_info(&mut self, sector: &Sector) -> Result<Arc<RenderInfo>> {
        let density = self.settings.density;
        if let Some(info) = self.geometry.render_info(density, sector) {
            if info.is_complete() || info.model_generation() == self.model.generation() {
                self.stats.meshes_reused += 1;
                return Ok(info);
            }
        }

        let indices = self.geometry.indices(density);
        let tex_coords = self.geometry.tex_coords(density);
        let info = Arc::new(build_render_info(
            &self.model,
            &self.settings.ellipsoid,
            sector,
            density,
            indices,
            tex_coords,
        )?);
        self.geometry.insert_render_info(Arc::clone(&info));
        self.stats.meshes_built += 1;
        tracing::trace!(%sector, complete = info.is_complete(), "built tile mesh");
        Ok(info)
    }

    /// Point on the rendered surface at a location.
    ///
    /// Interpolates the finest current tile containing the location; `None`
    /// when no current tile does.
    #[must_use]
    pub fn surface_point(&self, latitude: Angle, longitude: Angle) -> Option<DVec3> {
        self.current
            .iter()
            .filter(|tile| tile.contains(latitude, longitude))
            .max_by_key(|tile| tile.level())
            .map(|tile| tile.render_info().interpolate(latitude, longitude))
    }

    fn needs_split(&self, metrics: &DetailMetrics, sector: &Sector) -> bool {
        let ellipsoid = &self.settings.ellipsoid;
        let cell_size =
            sector.delta_lat().radians() / self.settings.density as f64 * ellipsoid.radius();
        let centroid = sector.centroid();
        let center = ellipsoid.geodetic_to_cartesian(centroid.latitude, centroid.longitude, 0.0);
        metrics.should_split(center, cell_size)
    }
}

/// The fixed top-level grid, south to north then west to east.
fn top_level_sectors(num_lat: usize, num_lon: usize) -> Vec<Sector> {
    let delta_lat = 180.0 / num_lat as f64;
    let delta_lon = 360.0 / num_lon as f64;
    (0..num_lat)
        .flat_map(|j| {
            let min_lat = -90.0 + delta_lat * j as f64;
            (0..num_lon).map(move |i| {
                let min_lon = -180.0 + delta_lon * i as f64;
                Sector::from_degrees(min_lat, min_lat + delta_lat, min_lon, min_lon + delta_lon)
            })
        })
        .collect()
}

/// Shallowest level whose grid cells are no larger than the model's finest
/// texels, capped by the settings.
fn finest_supported_level(model: &ElevationModel, settings: &TessellatorSettings) -> usize {
    let best = model.best_resolution();
    let mut cell = std::f64::consts::PI / settings.num_lat as f64 / settings.density as f64;
    let mut level = 0;
    while cell > best && level < settings.max_level_cap {
        cell /= 2.0;
        level += 1;
    }
    level
}
