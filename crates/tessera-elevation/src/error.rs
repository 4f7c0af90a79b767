//! Error types for the elevation crate.

use std::fmt;
use std::path::PathBuf;

/// Result type for elevation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in elevation operations.
///
/// Configuration and format errors describe a dataset that cannot work as
/// configured and are meant to stop the caller. Errors about a single tile
/// are logged by the model and leave that tile absent.
#[derive(Debug)]
pub enum Error {
    /// Reading a file failed.
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// A required configuration key is not set.
    MissingConfig {
        /// The key that was looked up.
        key: String,
    },
    /// A configuration value could not be parsed.
    InvalidConfig {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        detail: String,
    },
    /// The dataset uses a sample type or byte order this crate cannot decode.
    UnsupportedFormat {
        /// What was being decoded.
        context: &'static str,
        /// The unsupported value.
        detail: String,
    },
    /// A level index outside the pyramid.
    LevelOutOfRange {
        /// The requested level.
        level: usize,
        /// Number of levels in the pyramid.
        num_levels: usize,
    },
    /// A tile file had the wrong size or shape.
    InvalidTile {
        /// The tile file.
        path: PathBuf,
        /// Description of the mismatch.
        detail: String,
    },
    /// The extreme-elevation raster could not be used.
    ExtremesFile {
        /// The raster file.
        path: PathBuf,
        /// Description of the problem.
        detail: String,
    },
    /// The background loader runtime could not be started.
    Runtime {
        /// The underlying error.
        source: std::io::Error,
    },
    /// The background loader has shut down.
    LoaderClosed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            Error::MissingConfig { key } => {
                write!(f, "missing configuration value {key}")
            }
            Error::InvalidConfig { key, detail } => {
                write!(f, "invalid configuration value {key}: {detail}")
            }
            Error::UnsupportedFormat { context, detail } => {
                write!(f, "unsupported {context}: {detail}")
            }
            Error::LevelOutOfRange { level, num_levels } => {
                write!(f, "level {level} out of range for {num_levels} levels")
            }
            Error::InvalidTile { path, detail } => {
                write!(f, "invalid tile {}: {detail}", path.display())
            }
            Error::ExtremesFile { path, detail } => {
                write!(f, "invalid extreme elevations {}: {detail}", path.display())
            }
            Error::Runtime { source } => write!(f, "failed to start tile loader: {source}"),
            Error::LoaderClosed => write!(f, "tile loader is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } | Error::Runtime { source } => Some(source),
            _ => None,
        }
    }
}

impl From<tessera_geo::ParseError> for Error {
    fn from(e: tessera_geo::ParseError) -> Self {
        Error::InvalidConfig {
            key: "geodetic value".to_string(),
            detail: e.to_string(),
        }
    }
}
