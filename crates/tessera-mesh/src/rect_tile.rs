//! Tiles selected for rendering.

use std::sync::Arc;

use glam::DVec3;
use tessera_geo::{Angle, Sector};

use crate::bounding_box::BoundingBox;
use crate::render_info::RenderInfo;

/// A visible tile of the current tessellation.
#[derive(Debug, Clone)]
pub struct RectTile {
    sector: Sector,
    level: usize,
    bounding_box: BoundingBox,
    render_info: Arc<RenderInfo>,
}

impl RectTile {
    pub(crate) fn new(
        sector: Sector,
        level: usize,
        bounding_box: BoundingBox,
        render_info: Arc<RenderInfo>,
    ) -> Self {
        Self {
            sector,
            level,
            bounding_box,
            render_info,
        }
    }

    #[must_use]
    pub fn sector(&self) -> &Sector {
        &self.sector
    }

    /// Quadtree depth below the top-level tiles.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn density(&self) -> usize {
        self.render_info.density()
    }

    #[must_use]
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    #[must_use]
    pub fn reference_center(&self) -> DVec3 {
        self.render_info.reference_center()
    }

    #[must_use]
    pub fn render_info(&self) -> &Arc<RenderInfo> {
        &self.render_info
    }

    #[must_use]
    pub fn contains(&self, latitude: Angle, longitude: Angle) -> bool {
        self.sector.contains(latitude, longitude)
    }
}
