//! Renderable tile geometry.

use std::sync::Arc;

use glam::{DVec3, Vec2, Vec3};
use tessera_elevation::Cacheable;
use tessera_geo::{Angle, Sector};

/// Vertex data for one tile, ready for upload as an indexed triangle strip.
///
/// Positions are single precision relative to a double-precision reference
/// center. The grid is `(density + 3)` vertices per side, row-major from the
/// south-west corner; its outer ring is the skirt. Index and texture
/// coordinate buffers are shared by every tile of the same density.
#[derive(Debug)]
pub struct RenderInfo {
    pub(crate) density: usize,
    pub(crate) sector: Sector,
    pub(crate) reference_center: DVec3,
    pub(crate) vertices: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) indices: Arc<[u32]>,
    pub(crate) tex_coords: Arc<[Vec2]>,
    pub(crate) elevations_complete: bool,
    pub(crate) model_generation: u64,
}

impl RenderInfo {
    #[must_use]
    pub fn density(&self) -> usize {
        self.density
    }

    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    /// Vertices per side of the grid, skirt included.
    #[must_use]
    pub fn side(&self) -> usize {
        self.density + 3
    }

    #[must_use]
    pub fn reference_center(&self) -> DVec3 {
        self.reference_center
    }

    /// Positions relative to [`RenderInfo::reference_center`].
    #[must_use]
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    #[must_use]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    #[must_use]
    pub fn indices(&self) -> &Arc<[u32]> {
        &self.indices
    }

    #[must_use]
    pub fn tex_coords(&self) -> &Arc<[Vec2]> {
        &self.tex_coords
    }

    /// True when every elevation tile wanted for this mesh was resident.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.elevations_complete
    }

    /// Model generation the mesh was built against.
    #[must_use]
    pub fn model_generation(&self) -> u64 {
        self.model_generation
    }

    /// Absolute position of grid vertex `(i, j)`.
    #[must_use]
    pub fn world_position(&self, i: usize, j: usize) -> DVec3 {
        self.reference_center + self.vertices[j * self.side() + i].as_dvec3()
    }

    /// Bilinear interpolation of the built grid at a location in the sector.
    ///
    /// Only the interior grid is used; the skirt never contributes.
    #[must_use]
    pub fn interpolate(&self, latitude: Angle, longitude: Angle) -> DVec3 {
        let density = self.density as f64;
        let s = ((longitude.degrees() - self.sector.min_longitude().degrees())
            / self.sector.delta_lon().degrees())
        .clamp(0.0, 1.0)
            * density;
        let t = ((latitude.degrees() - self.sector.min_latitude().degrees())
            / self.sector.delta_lat().degrees())
        .clamp(0.0, 1.0)
            * density;

        let i = (s.floor() as usize).min(self.density - 1);
        let j = (t.floor() as usize).min(self.density - 1);
        let fs = s - i as f64;
        let ft = t - j as f64;

        // Interior vertex (i, j) sits at grid index (i + 1, j + 1).
        let sw = self.world_position(i + 1, j + 1);
        let se = self.world_position(i + 2, j + 1);
        let nw = self.world_position(i + 1, j + 2);
        let ne = self.world_position(i + 2, j + 2);

        let south = sw.lerp(se, fs);
        let north = nw.lerp(ne, fs);
        south.lerp(north, ft)
    }
}

impl Cacheable for RenderInfo {
    fn size_in_bytes(&self) -> usize {
        std::mem::size_of::<Self>()
            + (self.vertices.len() + self.normals.len()) * std::mem::size_of::<Vec3>()
    }
}
