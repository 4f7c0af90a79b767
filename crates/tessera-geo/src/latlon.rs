//! Geographic locations.

use std::fmt;
use std::str::FromStr;

use crate::angle::Angle;
use crate::error::{ParseError, parse_degrees};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatLon {
    pub latitude: Angle,
    pub longitude: Angle,
}

impl LatLon {
    pub const ZERO: LatLon = LatLon {
        latitude: Angle::ZERO,
        longitude: Angle::ZERO,
    };

    #[must_use]
    pub fn new(latitude: Angle, longitude: Angle) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self::new(Angle::from_degrees(latitude), Angle::from_degrees(longitude))
    }

    #[must_use]
    pub fn from_radians(latitude: f64, longitude: f64) -> Self {
        Self::new(Angle::from_radians(latitude), Angle::from_radians(longitude))
    }
}

impl FromStr for LatLon {
    type Err = ParseError;

    /// Parses `"lat,lon"` (or whitespace separated) in degrees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [lat, lon] = parse_degrees(s, "lat/lon")?;
        Ok(Self::from_degrees(lat, lon))
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// A location plus an elevation in metres above the ellipsoid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub lat_lon: LatLon,
    pub elevation: f64,
}

impl Position {
    #[must_use]
    pub fn new(latitude: Angle, longitude: Angle, elevation: f64) -> Self {
        Self {
            lat_lon: LatLon::new(latitude, longitude),
            elevation,
        }
    }

    #[must_use]
    pub fn from_degrees(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            lat_lon: LatLon::from_degrees(latitude, longitude),
            elevation,
        }
    }

    #[must_use]
    pub fn latitude(&self) -> Angle {
        self.lat_lon.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> Angle {
        self.lat_lon.longitude
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {:.2}m)",
            self.lat_lon.latitude, self.lat_lon.longitude, self.elevation
        )
    }
}
