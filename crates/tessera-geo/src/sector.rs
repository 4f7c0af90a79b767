//! Rectangular latitude/longitude regions.

use std::fmt;
use std::str::FromStr;

use crate::angle::Angle;
use crate::error::{ParseError, parse_degrees};
use crate::latlon::LatLon;

/// A rectangular region bounded by parallels and meridians.
///
/// `min <= max` holds on both axes; constructors order their arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    min_latitude: Angle,
    max_latitude: Angle,
    min_longitude: Angle,
    max_longitude: Angle,
    delta_lat: Angle,
    delta_lon: Angle,
}

/// Bit-exact hashable identity of a sector, for cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectorKey([u64; 4]);

impl Sector {
    #[must_use]
    pub fn new(lat_a: Angle, lat_b: Angle, lon_a: Angle, lon_b: Angle) -> Self {
        let (min_latitude, max_latitude) = if lat_a.degrees() <= lat_b.degrees() {
            (lat_a, lat_b)
        } else {
            (lat_b, lat_a)
        };
        let (min_longitude, max_longitude) = if lon_a.degrees() <= lon_b.degrees() {
            (lon_a, lon_b)
        } else {
            (lon_b, lon_a)
        };
        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
            delta_lat: max_latitude - min_latitude,
            delta_lon: max_longitude - min_longitude,
        }
    }

    #[must_use]
    pub fn from_degrees(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self::new(
            Angle::from_degrees(min_lat),
            Angle::from_degrees(max_lat),
            Angle::from_degrees(min_lon),
            Angle::from_degrees(max_lon),
        )
    }

    #[must_use]
    pub fn full_sphere() -> Self {
        Self::new(Angle::NEG90, Angle::POS90, Angle::NEG180, Angle::POS180)
    }

    #[must_use]
    pub fn min_latitude(&self) -> Angle {
        self.min_latitude
    }

    #[must_use]
    pub fn max_latitude(&self) -> Angle {
        self.max_latitude
    }

    #[must_use]
    pub fn min_longitude(&self) -> Angle {
        self.min_longitude
    }

    #[must_use]
    pub fn max_longitude(&self) -> Angle {
        self.max_longitude
    }

    #[must_use]
    pub fn delta_lat(&self) -> Angle {
        self.delta_lat
    }

    #[must_use]
    pub fn delta_lon(&self) -> Angle {
        self.delta_lon
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, latitude: Angle, longitude: Angle) -> bool {
        let lat = latitude.degrees();
        let lon = longitude.degrees();
        lat >= self.min_latitude.degrees()
            && lat <= self.max_latitude.degrees()
            && lon >= self.min_longitude.degrees()
            && lon <= self.max_longitude.degrees()
    }

    #[must_use]
    pub fn contains_lat_lon(&self, location: &LatLon) -> bool {
        self.contains(location.latitude, location.longitude)
    }

    /// True when `other` lies entirely inside this sector.
    #[must_use]
    pub fn contains_sector(&self, other: &Sector) -> bool {
        other.min_latitude.degrees() >= self.min_latitude.degrees()
            && other.max_latitude.degrees() <= self.max_latitude.degrees()
            && other.min_longitude.degrees() >= self.min_longitude.degrees()
            && other.max_longitude.degrees() <= self.max_longitude.degrees()
    }

    #[must_use]
    pub fn centroid(&self) -> LatLon {
        LatLon::new(
            Angle::mid_angle(self.min_latitude, self.max_latitude),
            Angle::mid_angle(self.min_longitude, self.max_longitude),
        )
    }

    /// True when the two sectors overlap. Shared edges count as overlap.
    #[must_use]
    pub fn intersects(&self, other: &Sector) -> bool {
        !(other.max_longitude.degrees() < self.min_longitude.degrees()
            || other.min_longitude.degrees() > self.max_longitude.degrees()
            || other.max_latitude.degrees() < self.min_latitude.degrees()
            || other.min_latitude.degrees() > self.max_latitude.degrees())
    }

    /// The overlapping region, or `None` when the sectors are disjoint.
    #[must_use]
    pub fn intersection(&self, other: &Sector) -> Option<Sector> {
        if !self.intersects(other) {
            return None;
        }
        Some(Sector::from_degrees(
            self.min_latitude
                .degrees()
                .max(other.min_latitude.degrees()),
            self.max_latitude
                .degrees()
                .min(other.max_latitude.degrees()),
            self.min_longitude
                .degrees()
                .max(other.min_longitude.degrees()),
            self.max_longitude
                .degrees()
                .min(other.max_longitude.degrees()),
        ))
    }

    /// Smallest sector enclosing both.
    #[must_use]
    pub fn union(&self, other: &Sector) -> Sector {
        Sector::from_degrees(
            self.min_latitude
                .degrees()
                .min(other.min_latitude.degrees()),
            self.max_latitude
                .degrees()
                .max(other.max_latitude.degrees()),
            self.min_longitude
                .degrees()
                .min(other.min_longitude.degrees()),
            self.max_longitude
                .degrees()
                .max(other.max_longitude.degrees()),
        )
    }

    /// Split at the midpoint into the four quadtree children,
    /// ordered south-west, south-east, north-west, north-east.
    #[must_use]
    pub fn subdivide(&self) -> [Sector; 4] {
        let mid_lat = Angle::mid_angle(self.min_latitude, self.max_latitude);
        let mid_lon = Angle::mid_angle(self.min_longitude, self.max_longitude);
        [
            Sector::new(self.min_latitude, mid_lat, self.min_longitude, mid_lon),
            Sector::new(self.min_latitude, mid_lat, mid_lon, self.max_longitude),
            Sector::new(mid_lat, self.max_latitude, self.min_longitude, mid_lon),
            Sector::new(mid_lat, self.max_latitude, mid_lon, self.max_longitude),
        ]
    }

    /// Area in square degrees.
    #[must_use]
    pub fn area_degrees(&self) -> f64 {
        self.delta_lat.degrees() * self.delta_lon.degrees()
    }

    /// Corner locations, counter-clockwise from the south-west corner.
    #[must_use]
    pub fn corners(&self) -> [LatLon; 4] {
        [
            LatLon::new(self.min_latitude, self.min_longitude),
            LatLon::new(self.min_latitude, self.max_longitude),
            LatLon::new(self.max_latitude, self.max_longitude),
            LatLon::new(self.max_latitude, self.min_longitude),
        ]
    }

    #[must_use]
    pub fn key(&self) -> SectorKey {
        // Adding 0.0 folds -0.0 into 0.0 so equal sectors share a key.
        let bits = |a: Angle| (a.degrees() + 0.0).to_bits();
        SectorKey([
            bits(self.min_latitude),
            bits(self.max_latitude),
            bits(self.min_longitude),
            bits(self.max_longitude),
        ])
    }
}

impl FromStr for Sector {
    type Err = ParseError;

    /// Parses `"minLat maxLat minLon maxLon"` in degrees.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [min_lat, max_lat, min_lon, max_lon] = parse_degrees(s, "sector")?;
        Ok(Self::from_degrees(min_lat, max_lat, min_lon, max_lon))
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] x [{}, {}]",
            self.min_latitude, self.max_latitude, self.min_longitude, self.max_longitude
        )
    }
}
