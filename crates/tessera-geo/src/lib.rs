//! Geodetic value types and ellipsoid transforms.
//!
//! This crate provides the pure, synchronous math shared by the elevation
//! model and the tessellator: angles, locations, rectangular sectors and the
//! WGS84 forward/inverse transforms.
//!
//! # Design principles
//!
//! - **Values, not handles**: every type is `Copy` and immutable
//! - **Both units cached**: angles carry degrees and radians side by side
//! - **Double precision**: single precision is left to the renderer

mod error;

pub mod angle;
pub mod ellipsoid;
pub mod latlon;
pub mod sector;

pub use angle::Angle;
pub use ellipsoid::{Ellipsoid, depth_limited_near_distance, perspective_near_distance};
pub use error::ParseError;
pub use latlon::{LatLon, Position};
pub use sector::{Sector, SectorKey};
