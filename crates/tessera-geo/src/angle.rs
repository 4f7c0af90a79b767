//! Angles stored in both degrees and radians.

use std::cmp::Ordering;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Tolerance used by angle equality, in degrees.
pub const EPSILON_DEGREES: f64 = 1e-6;

/// An immutable angle.
///
/// Both representations are computed once at construction so that repeated
/// trigonometry never pays for (or drifts through) a unit conversion.
/// Arithmetic operates on degrees and regenerates the radian value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Angle {
    degrees: f64,
    radians: f64,
}

impl Angle {
    pub const ZERO: Angle = Angle {
        degrees: 0.0,
        radians: 0.0,
    };
    pub const POS90: Angle = Angle {
        degrees: 90.0,
        radians: FRAC_PI_2,
    };
    pub const NEG90: Angle = Angle {
        degrees: -90.0,
        radians: -FRAC_PI_2,
    };
    pub const POS180: Angle = Angle {
        degrees: 180.0,
        radians: PI,
    };
    pub const NEG180: Angle = Angle {
        degrees: -180.0,
        radians: -PI,
    };
    pub const POS360: Angle = Angle {
        degrees: 360.0,
        radians: TAU,
    };

    #[must_use]
    pub fn from_degrees(degrees: f64) -> Self {
        Self {
            degrees,
            radians: degrees.to_radians(),
        }
    }

    #[must_use]
    pub fn from_radians(radians: f64) -> Self {
        Self {
            degrees: radians.to_degrees(),
            radians,
        }
    }

    #[must_use]
    pub fn degrees(self) -> f64 {
        self.degrees
    }

    #[must_use]
    pub fn radians(self) -> f64 {
        self.radians
    }

    #[must_use]
    pub fn sin(self) -> f64 {
        self.radians.sin()
    }

    #[must_use]
    pub fn cos(self) -> f64 {
        self.radians.cos()
    }

    /// Tangent of half this angle, the quantity perspective projections use.
    #[must_use]
    pub fn tan_half_angle(self) -> f64 {
        (0.5 * self.radians).tan()
    }

    #[must_use]
    pub fn abs(self) -> Self {
        Self::from_degrees(self.degrees.abs())
    }

    /// The midpoint of two angles.
    #[must_use]
    pub fn mid_angle(a: Angle, b: Angle) -> Self {
        Self::from_degrees(0.5 * (a.degrees + b.degrees))
    }

    /// Arithmetic mean of a set of angles. Returns zero for an empty set.
    #[must_use]
    pub fn average<I: IntoIterator<Item = Angle>>(angles: I) -> Self {
        let (sum, count) = angles
            .into_iter()
            .fold((0.0, 0u32), |(sum, count), a| (sum + a.degrees, count + 1));
        if count == 0 {
            return Self::ZERO;
        }
        Self::from_degrees(sum / f64::from(count))
    }

    #[must_use]
    pub fn clamp(self, min: Angle, max: Angle) -> Self {
        Self::from_degrees(self.degrees.clamp(min.degrees, max.degrees))
    }

    /// Fold a latitude back into [-90, 90], reflecting across the poles.
    #[must_use]
    pub fn normalized_latitude(self) -> Self {
        let lat = self.degrees % 180.0;
        let folded = if lat > 90.0 {
            180.0 - lat
        } else if lat < -90.0 {
            -180.0 - lat
        } else {
            lat
        };
        Self::from_degrees(folded)
    }

    /// Wrap a longitude into [-180, 180].
    #[must_use]
    pub fn normalized_longitude(self) -> Self {
        let lon = self.degrees % 360.0;
        let wrapped = if lon > 180.0 {
            lon - 360.0
        } else if lon < -180.0 {
            lon + 360.0
        } else {
            lon
        };
        Self::from_degrees(wrapped)
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        (self.degrees - other.degrees).abs() < EPSILON_DEGREES
    }
}

impl PartialOrd for Angle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        self.degrees.partial_cmp(&other.degrees)
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Angle) -> Angle {
        Angle::from_degrees(self.degrees + rhs.degrees)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Angle) -> Angle {
        Angle::from_degrees(self.degrees - rhs.degrees)
    }
}

impl Mul<f64> for Angle {
    type Output = Angle;

    fn mul(self, rhs: f64) -> Angle {
        Angle::from_degrees(self.degrees * rhs)
    }
}

impl Div<f64> for Angle {
    type Output = Angle;

    fn div(self, rhs: f64) -> Angle {
        Angle::from_degrees(self.degrees / rhs)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Angle {
        Angle {
            degrees: -self.degrees,
            radians: -self.radians,
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees)
    }
}
