//! Level-of-detail terrain meshes over an [`ElevationModel`].
//!
//! [`RectangularTessellator`] walks a quadtree over the globe each frame,
//! culls tiles against a [`Frustum`], splits the ones whose grid cells are
//! too coarse for their distance from the eye, and returns the remaining
//! [`RectTile`]s with their meshes. Each mesh is a `(density + 3)` square
//! vertex grid drawn as one triangle strip, with a skirt around its edge to
//! hide cracks between neighbours of different levels.
//!
//! Meshes use whatever elevation tiles are resident when they are built and
//! are rebuilt once better data lands, so tessellation never waits on I/O.
//!
//! [`ElevationModel`]: tessera_elevation::ElevationModel

mod bounding_box;
mod frustum;
pub mod geometry;
mod rect_tile;
mod render_info;
mod tessellator;

pub use bounding_box::BoundingBox;
pub use frustum::Frustum;
pub use geometry::SharedGeometry;
pub use rect_tile::RectTile;
pub use render_info::RenderInfo;
pub use tessellator::{
    DEFAULT_DENSITY, DEFAULT_DETAIL_SCALE, DEFAULT_RENDER_INFO_CAPACITY, RectangularTessellator,
    TessellationStats, TessellatorSettings,
};
