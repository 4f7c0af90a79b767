//! Mesh construction and the geometry caches shared between tiles.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{DVec3, Vec2, Vec3};
use tessera_elevation::{ElevationModel, MemoryCache, Result};
use tessera_geo::{Angle, Ellipsoid, Sector, SectorKey};

use crate::bounding_box::BoundingBox;
use crate::render_info::RenderInfo;

/// Cached bounding boxes are dropped wholesale past this many entries.
const BOUNDING_BOX_LIMIT: usize = 16_384;

/// Indices of a triangle strip covering a `(density + 3)` square grid.
///
/// Rows are joined by two degenerate indices, so the whole grid draws as a
/// single strip of `2n(n - 1) + 2(n - 2)` indices for `n = density + 3`.
#[must_use]
pub fn strip_indices(density: usize) -> Vec<u32> {
    let n = (density + 3) as u32;
    let mut indices = Vec::with_capacity(strip_index_count(density));
    for row in 0..n - 1 {
        for col in 0..n {
            indices.push((row + 1) * n + col);
            indices.push(row * n + col);
        }
        if row < n - 2 {
            indices.push(row * n + n - 1);
            indices.push((row + 2) * n);
        }
    }
    indices
}

/// Length of [`strip_indices`] for a density.
#[must_use]
pub fn strip_index_count(density: usize) -> usize {
    let n = density + 3;
    2 * n * (n - 1) + 2 * (n - 2)
}

/// Texture coordinates for a `(density + 3)` square grid, row-major from the
/// south-west corner. Skirt vertices repeat the coordinates of the edge they
/// hang from.
#[must_use]
pub fn grid_tex_coords(density: usize) -> Vec<Vec2> {
    let n = density + 3;
    let step = |k: usize| ((k as f32 - 1.0) / density as f32).clamp(0.0, 1.0);
    (0..n)
        .flat_map(|j| (0..n).map(move |i| Vec2::new(step(i), step(j))))
        .collect()
}

/// Angle of grid line `index` across an axis spanning `min..min + delta`.
///
/// The first two and last two lines both sit on the sector edge; the outer
/// one of each pair carries the skirt.
fn grid_angle(min: Angle, delta: Angle, density: usize, index: usize) -> Angle {
    let interior = index.saturating_sub(1).min(density);
    min + delta * (interior as f64 / density as f64)
}

/// Build the mesh of `sector` from whatever elevations are resident.
#[allow(clippy::float_cmp)]
pub(crate) fn build_render_info(
    model: &ElevationModel,
    ellipsoid: &Ellipsoid,
    sector: &Sector,
    density: usize,
    indices: Arc<[u32]>,
    tex_coords: Arc<[Vec2]>,
) -> Result<RenderInfo> {
    let n = density + 3;
    let generation = model.generation();

    let cell_size = sector.delta_lat().radians() / density as f64;
    let target_level = model.levels().target_level(cell_size).level_number();
    let elevations = model.get_elevations(sector, target_level)?;

    let centroid = sector.centroid();
    let reference_center =
        ellipsoid.geodetic_to_cartesian(centroid.latitude, centroid.longitude, 0.0);

    let mut positions = Vec::with_capacity(n * n);
    for j in 0..n {
        let latitude = grid_angle(sector.min_latitude(), sector.delta_lat(), density, j);
        for i in 0..n {
            let longitude = grid_angle(sector.min_longitude(), sector.delta_lon(), density, i);
            let skirt = i == 0 || j == 0 || i == n - 1 || j == n - 1;
            let elevation = if skirt {
                0.0
            } else {
                let sample = elevations.elevation(latitude, longitude);
                if sample == elevations.missing_data_signal() {
                    model.missing_data_replacement()
                } else {
                    sample
                }
            };
            positions.push(ellipsoid.geodetic_to_cartesian(latitude, longitude, elevation));
        }
    }

    let normals = grid_normals(ellipsoid, sector, density, &positions);
    let vertices = positions
        .iter()
        .map(|p| (*p - reference_center).as_vec3())
        .collect();

    Ok(RenderInfo {
        density,
        sector: *sector,
        reference_center,
        vertices,
        normals,
        indices,
        tex_coords,
        elevations_complete: elevations.is_complete(),
        model_generation: generation,
    })
}

/// Per-vertex normals from central differences over the interior grid.
fn grid_normals(
    ellipsoid: &Ellipsoid,
    sector: &Sector,
    density: usize,
    positions: &[DVec3],
) -> Vec<Vec3> {
    let n = density + 3;
    let at = |i: usize, j: usize| positions[j * n + i];
    let inner = |k: usize| k.clamp(1, n - 2);

    let mut normals = Vec::with_capacity(n * n);
    for j in 0..n {
        for i in 0..n {
            let skirt = i == 0 || j == 0 || i == n - 1 || j == n - 1;
            let (ci, cj) = (inner(i), inner(j));
            let east = at(inner(ci + 1), cj) - at(inner(ci - 1), cj);
            let north = at(ci, inner(cj + 1)) - at(ci, inner(cj - 1));
            let normal = east.cross(north).normalize_or_zero();

            let normal = if skirt || normal == DVec3::ZERO {
                let latitude = grid_angle(sector.min_latitude(), sector.delta_lat(), density, j);
                let longitude = grid_angle(sector.min_longitude(), sector.delta_lon(), density, i);
                ellipsoid.surface_normal(latitude, longitude)
            } else {
                normal
            };
            normals.push(normal.as_vec3());
        }
    }
    normals
}

/// Geometry reused across tiles and frames: strip indices and texture
/// coordinates per density, bounding boxes per sector and built meshes per
/// `(density, sector)`.
#[derive(Debug)]
pub struct SharedGeometry {
    indices: HashMap<usize, Arc<[u32]>>,
    tex_coords: HashMap<usize, Arc<[Vec2]>>,
    bounding_boxes: HashMap<SectorKey, BoundingBox>,
    render_infos: MemoryCache<(usize, SectorKey), RenderInfo>,
}

impl SharedGeometry {
    #[must_use]
    pub fn new(render_info_capacity: usize) -> Self {
        Self {
            indices: HashMap::new(),
            tex_coords: HashMap::new(),
            bounding_boxes: HashMap::new(),
            render_infos: MemoryCache::new(render_info_capacity),
        }
    }

    pub fn indices(&mut self, density: usize) -> Arc<[u32]> {
        self.indices
            .entry(density)
            .or_insert_with(|| strip_indices(density).into())
            .clone()
    }

    pub fn tex_coords(&mut self, density: usize) -> Arc<[Vec2]> {
        self.tex_coords
            .entry(density)
            .or_insert_with(|| grid_tex_coords(density).into())
            .clone()
    }

    /// Bounds of the terrain over `sector`, from the model's extreme
    /// elevations. The range always includes zero, where skirts sit.
    pub fn bounding_box(
        &mut self,
        model: &ElevationModel,
        ellipsoid: &Ellipsoid,
        sector: &Sector,
    ) -> BoundingBox {
        let key = sector.key();
        if let Some(bounds) = self.bounding_boxes.get(&key) {
            return *bounds;
        }

        let (min, max) = model.extreme_elevations_in(sector);
        let bounds = BoundingBox::for_sector(ellipsoid, sector, min.min(0.0), max.max(0.0));
        if self.bounding_boxes.len() >= BOUNDING_BOX_LIMIT {
            self.bounding_boxes.clear();
        }
        self.bounding_boxes.insert(key, bounds);
        bounds
    }

    #[must_use]
    pub fn render_info(&self, density: usize, sector: &Sector) -> Option<Arc<RenderInfo>> {
        self.render_infos.get(&(density, sector.key()))
    }

    /// Cache a built mesh. Returns `false` when it exceeds the cache's whole
    /// capacity and was not kept.
    pub fn insert_render_info(&self, info: Arc<RenderInfo>) -> bool {
        self.render_infos.put((info.density(), info.sector().key()), info)
    }

    #[must_use]
    pub fn render_info_count(&self) -> usize {
        self.render_infos.len()
    }

    #[must_use]
    pub fn render_info_bytes(&self) -> usize {
        self.render_infos.size()
    }

    /// Drop every cached buffer, box and mesh.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.tex_coords.clear();
        self.bounding_boxes.clear();
        self.render_infos.clear();
    }
}
