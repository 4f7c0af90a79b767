//! View frustum culling.

use glam::{DMat4, DVec3};

use crate::bounding_box::BoundingBox;

/// A view frustum as six inward-facing planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far; each `(normal, distance)`.
    planes: [(DVec3, f64); 6],
}

impl Frustum {
    /// Extract the frustum planes from a view-projection matrix with a
    /// `[0, 1]` clip-space depth range, as built by `perspective_rh`.
    #[must_use]
    pub fn from_matrix(view_projection: DMat4) -> Self {
        let m = view_projection.to_cols_array_2d();
        let row = |r: usize| [m[0][r], m[1][r], m[2][r], m[3][r]];
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        let combine = |a: [f64; 4], b: [f64; 4], sign: f64| {
            Self::normalize_plane(
                a[0] + sign * b[0],
                a[1] + sign * b[1],
                a[2] + sign * b[2],
                a[3] + sign * b[3],
            )
        };

        Self {
            planes: [
                combine(w, x, 1.0),
                combine(w, x, -1.0),
                combine(w, y, 1.0),
                combine(w, y, -1.0),
                Self::normalize_plane(z[0], z[1], z[2], z[3]),
                combine(w, z, -1.0),
            ],
        }
    }

    /// Frustum of a perspective camera at `eye` looking at `target`.
    #[must_use]
    pub fn from_camera(
        eye: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        aspect: f64,
        near: f64,
        far: f64,
    ) -> Self {
        let view = DMat4::look_at_rh(eye, target, up);
        let projection = DMat4::perspective_rh(fov_y, aspect, near, far);
        Self::from_matrix(projection * view)
    }

    fn normalize_plane(a: f64, b: f64, c: f64, d: f64) -> (DVec3, f64) {
        let normal = DVec3::new(a, b, c);
        let length = normal.length();
        if length > 0.0 {
            (normal / length, d / length)
        } else {
            (DVec3::ZERO, 0.0)
        }
    }

    /// True unless the box lies entirely outside one of the planes.
    #[must_use]
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        let center = bounds.center();
        let extents = bounds.extents();
        self.planes.iter().all(|&(normal, distance)| {
            let r = extents.dot(normal.abs());
            normal.dot(center) + distance >= -r
        })
    }

    #[must_use]
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.planes
            .iter()
            .all(|&(normal, distance)| normal.dot(point) + distance >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_negative_z() -> Frustum {
        Frustum::from_camera(
            DVec3::ZERO,
            DVec3::NEG_Z,
            DVec3::Y,
            std::f64::consts::FRAC_PI_2,
            1.0,
            1.0,
            1000.0,
        )
    }

    #[test]
    fn test_contains_point() {
        let frustum = looking_down_negative_z();
        assert!(frustum.contains_point(DVec3::new(0.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, 10.0)));
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, -2000.0)));
        // 90 degree field of view: x = -z is the edge.
        assert!(frustum.contains_point(DVec3::new(9.0, 0.0, -10.0)));
        assert!(!frustum.contains_point(DVec3::new(11.0, 0.0, -10.0)));
    }

    #[test]
    fn test_near_plane_sits_at_near_distance() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, -0.6)));
        assert!(!frustum.contains_point(DVec3::new(0.0, 0.0, -0.99)));
        assert!(frustum.contains_point(DVec3::new(0.0, 0.0, -1.01)));
        assert!(frustum.contains_point(DVec3::new(0.0, 0.0, -999.0)));
    }

    #[test]
    fn test_intersects_box() {
        let frustum = looking_down_negative_z();
        let inside = BoundingBox::new(DVec3::new(-1.0, -1.0, -20.0), DVec3::new(1.0, 1.0, -10.0));
        assert!(frustum.intersects_box(&inside));

        let behind = BoundingBox::new(DVec3::new(-1.0, -1.0, 10.0), DVec3::new(1.0, 1.0, 20.0));
        assert!(!frustum.intersects_box(&behind));

        // Straddling the left plane still intersects.
        let straddling =
            BoundingBox::new(DVec3::new(-30.0, -1.0, -20.0), DVec3::new(-15.0, 1.0, -10.0));
        assert!(frustum.intersects_box(&straddling));

        let beside = BoundingBox::new(DVec3::new(-300.0, -1.0, -20.0), DVec3::new(-200.0, 1.0, -10.0));
        assert!(!frustum.intersects_box(&beside));
    }
}
