//! Axis-aligned bounding boxes around terrain sectors.

use glam::DVec3;
use tessera_geo::{Angle, Ellipsoid, Sector};

/// Samples per side used to bound a sector.
const SECTOR_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: DVec3,
    max: DVec3,
}

impl BoundingBox {
    #[must_use]
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Bound the terrain over `sector` lying between two elevations.
    ///
    /// The sector is sampled on a regular grid at both elevations and the
    /// result grown by the ellipsoid's bulge between neighbouring samples.
    #[must_use]
    pub fn for_sector(
        ellipsoid: &Ellipsoid,
        sector: &Sector,
        min_elevation: f64,
        max_elevation: f64,
    ) -> Self {
        let steps = (SECTOR_SAMPLES - 1) as f64;
        let mut points = Vec::with_capacity(SECTOR_SAMPLES * SECTOR_SAMPLES * 2);
        for j in 0..SECTOR_SAMPLES {
            let lat = sector.min_latitude() + sector.delta_lat() * (j as f64 / steps);
            for i in 0..SECTOR_SAMPLES {
                let lon = sector.min_longitude() + sector.delta_lon() * (i as f64 / steps);
                points.push(ellipsoid.geodetic_to_cartesian(lat, lon, min_elevation));
                points.push(ellipsoid.geodetic_to_cartesian(lat, lon, max_elevation));
            }
        }

        let step = Angle::from_degrees(
            sector.delta_lat().degrees().max(sector.delta_lon().degrees()) / steps,
        );
        let outer_radius = ellipsoid.equatorial_radius() + max_elevation.max(0.0);
        let bulge = outer_radius * (1.0 - (step / 2.0).cos());

        let bounds = Self::from_points(points).unwrap_or(Self::new(DVec3::ZERO, DVec3::ZERO));
        bounds.expanded(bulge)
    }

    #[must_use]
    pub fn min(&self) -> DVec3 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> DVec3 {
        self.max
    }

    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis.
    #[must_use]
    pub fn extents(&self) -> DVec3 {
        (self.max - self.min) * 0.5
    }

    /// Radius of the enclosing sphere around the center.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.extents().length()
    }

    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self::new(self.min - DVec3::splat(margin), self.max + DVec3::splat(margin))
    }

    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Distance from `point` to the box, zero inside.
    #[must_use]
    pub fn distance_to(&self, point: DVec3) -> f64 {
        (self.min - point).max(point - self.max).max(DVec3::ZERO).length()
    }
}
