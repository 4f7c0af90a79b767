//! A perspective camera hovering over the globe.

use glam::DVec3;
use tessera_geo::{Angle, Ellipsoid};
use tessera_mesh::Frustum;

#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub eye: DVec3,
    pub target: DVec3,
    pub up: DVec3,
    pub field_of_view: Angle,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    /// A camera `altitude` metres above the ground at a location.
    ///
    /// A pitch of zero looks straight down with north up; 90 degrees looks
    /// north along the horizon.
    #[must_use]
    pub fn over(
        ellipsoid: &Ellipsoid,
        latitude: Angle,
        longitude: Angle,
        ground_elevation: f64,
        altitude: f64,
        pitch: Angle,
        field_of_view: Angle,
    ) -> Self {
        let eye_elevation = ground_elevation + altitude;
        let eye = ellipsoid.geodetic_to_cartesian(latitude, longitude, eye_elevation);

        let normal = ellipsoid.surface_normal(latitude, longitude);
        let north = DVec3::new(
            -latitude.sin() * longitude.sin(),
            latitude.cos(),
            -latitude.sin() * longitude.cos(),
        );
        let forward = -normal * pitch.cos() + north * pitch.sin();
        let up = normal * pitch.sin() + north * pitch.cos();

        Self {
            eye,
            target: eye + forward * altitude.max(1.0),
            up,
            field_of_view,
            near: ellipsoid.near_clip_distance(field_of_view, eye_elevation),
            far: ellipsoid.far_clip_distance(eye_elevation),
        }
    }

    #[must_use]
    pub fn frustum(&self, aspect: f64) -> Frustum {
        Frustum::from_camera(
            self.eye,
            self.target,
            self.up,
            self.field_of_view.radians(),
            aspect,
            self.near,
            self.far,
        )
    }
}
