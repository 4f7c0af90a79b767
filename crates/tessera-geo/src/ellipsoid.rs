//! Ellipsoidal globe transforms and camera clip-plane heuristics.
//!
//! Cartesian coordinates use a Y-up frame: +Y points to the north pole, +Z
//! crosses the equator at longitude 0 and +X crosses it at longitude 90°E.

use glam::DVec3;

use crate::angle::Angle;
use crate::latlon::Position;

/// Bits of depth-buffer precision assumed when deriving the near plane.
pub const DEPTH_BITS: u32 = 24;

/// Depth resolution, in metres, wanted at the far clip plane.
pub const FAR_RESOLUTION: f64 = 2.0;

/// Lower bound of the near clip distance in metres.
pub const MINIMUM_NEAR_DISTANCE: f64 = 1.0;

/// Lower bound of the far clip distance in metres.
pub const MINIMUM_FAR_DISTANCE: f64 = 100.0;

/// A reference ellipsoid of revolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    equatorial_radius: f64,
    polar_radius: f64,
    eccentricity_squared: f64,
}

impl Ellipsoid {
    /// The WGS84 datum.
    pub const WGS84: Ellipsoid = Ellipsoid {
        equatorial_radius: 6_378_137.0,
        polar_radius: 6_356_752.314_245,
        eccentricity_squared: 0.006_694_379_990_13,
    };

    #[must_use]
    pub fn new(equatorial_radius: f64, polar_radius: f64) -> Self {
        let ratio = polar_radius / equatorial_radius;
        Self {
            equatorial_radius,
            polar_radius,
            eccentricity_squared: 1.0 - ratio * ratio,
        }
    }

    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::new(radius, radius)
    }

    #[must_use]
    pub fn equatorial_radius(&self) -> f64 {
        self.equatorial_radius
    }

    #[must_use]
    pub fn polar_radius(&self) -> f64 {
        self.polar_radius
    }

    #[must_use]
    pub fn eccentricity_squared(&self) -> f64 {
        self.eccentricity_squared
    }

    /// The radius used for screen-space error estimates.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.equatorial_radius
    }

    /// Distance from the centre to the surface at the given geodetic latitude.
    #[must_use]
    pub fn radius_at(&self, latitude: Angle) -> f64 {
        self.geodetic_to_cartesian(latitude, Angle::ZERO, 0.0)
            .length()
    }

    /// Forward transform from geodetic coordinates to Cartesian.
    #[must_use]
    pub fn geodetic_to_cartesian(&self, latitude: Angle, longitude: Angle, elevation: f64) -> DVec3 {
        let cos_lat = latitude.cos();
        let sin_lat = latitude.sin();
        let cos_lon = longitude.cos();
        let sin_lon = longitude.sin();

        // Radius of curvature in the prime vertical.
        let rpm = self.equatorial_radius
            / (1.0 - self.eccentricity_squared * sin_lat * sin_lat).sqrt();

        DVec3::new(
            (rpm + elevation) * cos_lat * sin_lon,
            (rpm * (1.0 - self.eccentricity_squared) + elevation) * sin_lat,
            (rpm + elevation) * cos_lat * cos_lon,
        )
    }

    #[must_use]
    pub fn position_to_cartesian(&self, position: &Position) -> DVec3 {
        self.geodetic_to_cartesian(position.latitude(), position.longitude(), position.elevation)
    }

    /// Inverse transform using Vermeille's closed form (Journal of Geodesy,
    /// 2002, "Direct transformation from geocentric coordinates to geodetic
    /// coordinates").
    #[must_use]
    pub fn cartesian_to_geodetic(&self, point: DVec3) -> Position {
        // Geocentric axes: X toward longitude 0, Y toward 90°E, Z north.
        let x = point.z;
        let y = point.x;
        let z = point.y;

        let xx_p_yy = x * x + y * y;
        let sqrt_xx_p_yy = xx_p_yy.sqrt();

        let a = self.equatorial_radius;
        let ra2 = 1.0 / (a * a);
        let e2 = self.eccentricity_squared;
        let e4 = e2 * e2;

        let p = xx_p_yy * ra2;
        let q = z * z * (1.0 - e2) * ra2;
        let r = (p + q - e4) / 6.0;

        let evolute_border_test = 8.0 * r * r * r + e4 * p * q;

        let (phi, h) = if evolute_border_test > 0.0 || q != 0.0 {
            let u = if evolute_border_test > 0.0 {
                let rad1 = evolute_border_test.sqrt();
                let rad2 = (e4 * p * q).sqrt();

                // Away from the cusps of the evolute a single cube root suffices.
                if evolute_border_test > 10.0 * e2 {
                    let rad3 = ((rad1 + rad2) * (rad1 + rad2)).cbrt();
                    r + 0.5 * rad3 + 2.0 * r * r / rad3
                } else {
                    r + 0.5 * ((rad1 + rad2) * (rad1 + rad2)).cbrt()
                        + 0.5 * ((rad1 - rad2) * (rad1 - rad2)).cbrt()
                }
            } else {
                // Inside the evolute.
                let rad1 = (-evolute_border_test).sqrt();
                let rad2 = (-8.0 * r * r * r).sqrt();
                let rad3 = (e4 * p * q).sqrt();
                let atan = 2.0 * rad3.atan2(rad1 + rad2) / 3.0;
                -4.0 * r * atan.sin() * (std::f64::consts::FRAC_PI_6 + atan).cos()
            };

            let v = (u * u + e4 * q).sqrt();
            let w = e2 * (u + v - q) / (2.0 * v);
            let k = (u + v) / ((w * w + u + v).sqrt() + w);
            let d = k * sqrt_xx_p_yy / (k + e2);
            let sqrt_dd_p_zz = (d * d + z * z).sqrt();

            let h = (k + e2 - 1.0) * sqrt_dd_p_zz / k;
            let phi = 2.0 * z.atan2(sqrt_dd_p_zz + d);
            (phi, h)
        } else {
            // Singular disk in the equatorial plane near the centre.
            let rad1 = (1.0 - e2).sqrt();
            let rad2 = (e2 - p).sqrt();
            let e = e2.sqrt();

            let h = -a * rad1 * rad2 / e;
            let phi = 2.0 * (e4 - p).sqrt().atan2(e * rad2 + rad1 * p.sqrt());
            (phi, h)
        };

        // Longitude, choosing the numerically best-conditioned half-angle form.
        let s2 = std::f64::consts::SQRT_2;
        let lambda = if (s2 - 1.0) * y < sqrt_xx_p_yy + x {
            2.0 * y.atan2(sqrt_xx_p_yy + x)
        } else if sqrt_xx_p_yy + y < (s2 + 1.0) * x {
            -std::f64::consts::FRAC_PI_2 + 2.0 * x.atan2(sqrt_xx_p_yy - y)
        } else {
            std::f64::consts::FRAC_PI_2 - 2.0 * x.atan2(sqrt_xx_p_yy + y)
        };

        Position::new(Angle::from_radians(phi), Angle::from_radians(lambda), h)
    }

    /// Unit normal to the ellipsoid surface at a geodetic location.
    #[must_use]
    pub fn surface_normal(&self, latitude: Angle, longitude: Angle) -> DVec3 {
        let cos_lat = latitude.cos();
        DVec3::new(
            cos_lat * longitude.sin(),
            latitude.sin(),
            cos_lat * longitude.cos(),
        )
    }

    /// Distance to the horizon from a point `elevation` metres above the surface.
    #[must_use]
    pub fn horizon_distance(&self, elevation: f64) -> f64 {
        if elevation <= 0.0 {
            return 0.0;
        }
        (elevation * (2.0 * self.equatorial_radius + elevation)).sqrt()
    }

    /// Far clip distance for an eye at `eye_elevation` above the ellipsoid.
    #[must_use]
    pub fn far_clip_distance(&self, eye_elevation: f64) -> f64 {
        self.horizon_distance(eye_elevation)
            .max(MINIMUM_FAR_DISTANCE)
    }

    /// Near clip distance balancing view clearance against depth precision at
    /// the far plane.
    #[must_use]
    pub fn near_clip_distance(&self, field_of_view: Angle, eye_elevation: f64) -> f64 {
        let far = self.far_clip_distance(eye_elevation);
        let near = perspective_near_distance(field_of_view, eye_elevation.max(0.0));
        let depth_limited = depth_limited_near_distance(far, FAR_RESOLUTION, DEPTH_BITS);
        near.max(depth_limited).max(MINIMUM_NEAR_DISTANCE)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

/// Largest near distance that keeps an object `distance_to_object` away
/// inside the view volume for the given field of view.
#[must_use]
pub fn perspective_near_distance(field_of_view: Angle, distance_to_object: f64) -> f64 {
    let tan_half_fov = field_of_view.tan_half_angle();
    distance_to_object / (2.0 * (2.0 * tan_half_fov * tan_half_fov + 1.0).sqrt())
}

/// Smallest near distance that still resolves `far_resolution` metres at the
/// far plane with a depth buffer of `depth_bits` bits.
#[must_use]
pub fn depth_limited_near_distance(far_distance: f64, far_resolution: f64, depth_bits: u32) -> f64 {
    let max_depth_value = ((1u64 << depth_bits.clamp(1, 52)) - 1) as f64;
    far_distance / (max_depth_value / (1.0 - far_resolution / far_distance) - max_depth_value + 1.0)
}
