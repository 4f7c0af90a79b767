//! Multi-resolution elevation rasters with an asynchronous tile cache.
//!
//! An [`ElevationModel`] serves elevations from a pyramid of raw raster tiles
//! stored on disk. Tiles are loaded in the background by a [`TileLoader`] and
//! picked up by the caller with [`ElevationModel::poll`], so queries never
//! wait on I/O. Regions are queried with [`ElevationModel::get_elevations`],
//! which returns an [`Elevations`] snapshot of whatever is resident.
//!
//! # Design principles
//!
//! - **Non-blocking queries**: missing tiles are requested and reported as
//!   missing; only [`ElevationModel::load_all_level_zero_tiles`] waits
//! - **Shared tiles**: decoded tiles are `Arc`-shared between the cache and
//!   snapshots, so eviction never invalidates a snapshot
//! - **Sync decoding**: decode functions are synchronous; the loader
//!   parallelizes them
//!
//! # Example
//!
//! ```ignore
//! use tessera_elevation::{ElevationConfig, ElevationModel};
//! use tessera_geo::{Angle, Sector};
//!
//! let config = ElevationConfig::load("dataset.json".as_ref())?;
//! let model = ElevationModel::from_config(&config)?;
//! model.load_all_level_zero_tiles()?;
//!
//! let sector = Sector::from_degrees(45.0, 46.0, 6.0, 7.0);
//! let elevations = model.get_elevations(&sector, 3)?;
//! let height = elevations.elevation(Angle::from_degrees(45.5), Angle::from_degrees(6.5));
//! ```

pub mod cache;
pub mod config;
mod elevations;
mod error;
pub mod extremes;
pub mod format;
pub mod level;
pub mod loader;
mod model;
pub mod tile;

pub use cache::{Cacheable, MemoryCache, MutexMap, MutexSet};
pub use config::{ElevationConfig, keys};
pub use elevations::Elevations;
pub use error::{Error, Result};
pub use extremes::ExtremeElevations;
pub use format::{ByteOrder, DataType, SampleFormat};
pub use level::{Level, LevelSet, LevelSetParams};
pub use loader::{LoadOutcome, LoadRequest, LoadResult, LoaderOptions, TileLoader};
pub use model::{DEFAULT_MISSING_DATA_SIGNAL, DEFAULT_TILE_CACHE_CAPACITY, ElevationModel};
pub use tile::{ElevationTile, Tile, TileKey};
