//! Typed key/value configuration for elevation datasets.
//!
//! A dataset is described by a flat set of string values. Typed access goes
//! through [`ElevationConfig::get_value`], which parses with [`FromStr`] and
//! reports the offending key on failure. A flat JSON object can be loaded
//! with [`ElevationConfig::load`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Well-known configuration keys.
pub mod keys {
    pub const LEVEL_NUMBER: &str = "LEVEL_NUMBER";
    pub const LEVEL_NAME: &str = "LEVEL_NAME";
    pub const TILE_WIDTH: &str = "TILE_WIDTH";
    pub const TILE_HEIGHT: &str = "TILE_HEIGHT";
    pub const TILE_DELTA: &str = "TILE_DELTA";
    pub const DATA_CACHE_NAME: &str = "DATA_CACHE_NAME";
    pub const FORMAT_SUFFIX: &str = "FORMAT_SUFFIX";
    pub const NUM_LEVELS: &str = "NUM_LEVELS";
    pub const LEVEL_ZERO_TILE_DELTA: &str = "LEVEL_ZERO_TILE_DELTA";
    pub const SECTOR: &str = "SECTOR";
    pub const TILE_ORIGIN: &str = "TILE_ORIGIN";
    pub const DATA_TYPE: &str = "DATA_TYPE";
    pub const BYTE_ORDER: &str = "BYTE_ORDER";
    pub const MODEL_STORE_PATH: &str = "MODEL_STORE_PATH";
    pub const ELEVATION_MIN: &str = "ELEVATION_MIN";
    pub const ELEVATION_MAX: &str = "ELEVATION_MAX";
    pub const ELEVATION_EXTREMES_FILE: &str = "ELEVATION_EXTREMES_FILE";
    pub const DETAIL_HINT: &str = "DETAIL_HINT";
    pub const MISSING_DATA_SIGNAL: &str = "MISSING_DATA_SIGNAL";
    pub const MISSING_DATA_REPLACEMENT: &str = "MISSING_DATA_REPLACEMENT";
    pub const TILE_CACHE_CAPACITY: &str = "TILE_CACHE_CAPACITY";
    pub const LOADER_THREADS: &str = "LOADER_THREADS";
    pub const LOADER_QUEUE_DEPTH: &str = "LOADER_QUEUE_DEPTH";
}

/// A scalar as it appears in a JSON configuration file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Integer(i) => write!(f, "{i}"),
            RawValue::Float(x) => write!(f, "{x}"),
            RawValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Flat string key/value configuration with typed accessors.
#[derive(Debug, Clone, Default)]
pub struct ElevationConfig {
    values: HashMap<String, String>,
}

impl ElevationConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        Self { values }
    }

    /// Load a flat JSON object from disk.
    ///
    /// Relative `MODEL_STORE_PATH` and `ELEVATION_EXTREMES_FILE` values are
    /// resolved against the directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;

        if let Some(base) = path.parent() {
            for key in [keys::MODEL_STORE_PATH, keys::ELEVATION_EXTREMES_FILE] {
                if let Some(value) = config.values.get_mut(key) {
                    let relative = Path::new(value.as_str());
                    if relative.is_relative() {
                        *value = base.join(relative).to_string_lossy().into_owned();
                    }
                }
            }
        }

        tracing::debug!(path = %path.display(), keys = config.len(), "loaded configuration");
        Ok(config)
    }

    /// Parse a flat JSON object whose values are strings, numbers or booleans.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: HashMap<String, RawValue> =
            serde_json::from_str(text).map_err(|e| Error::InvalidConfig {
                key: "<document>".to_string(),
                detail: e.to_string(),
            })?;
        Ok(Self::from_pairs(raw))
    }

    /// Write the configuration as a flat JSON object with sorted keys.
    pub fn save(&self, path: &Path) -> Result<()> {
        let sorted: BTreeMap<&str, &str> = self
            .values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let text = serde_json::to_string_pretty(&sorted).map_err(|e| Error::InvalidConfig {
            key: "<document>".to_string(),
            detail: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the value stored under `key`.
    pub fn get_value<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.values.get(key).ok_or_else(|| Error::MissingConfig {
            key: key.to_string(),
        })?;
        parse_value(key, raw)
    }

    /// Parse the value stored under `key`, or return `default` when unset.
    /// A value that is present but malformed is still an error.
    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.values.get(key) {
            Some(raw) => parse_value(key, raw),
            None => Ok(default),
        }
    }

    pub fn get_optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.values
            .get(key)
            .map(|raw| parse_value(key, raw))
            .transpose()
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| Error::InvalidConfig {
        key: key.to_string(),
        detail: format!("{raw:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_geo::{LatLon, Sector};

    #[test]
    fn test_typed_access() {
        let config = ElevationConfig::from_pairs([
            (keys::TILE_WIDTH, "150"),
            (keys::SECTOR, "-90 90 -180 180"),
            (keys::TILE_ORIGIN, "-90,-180"),
        ]);
        assert_eq!(config.get_value::<usize>(keys::TILE_WIDTH).unwrap(), 150);
        assert_eq!(
            config.get_value::<Sector>(keys::SECTOR).unwrap(),
            Sector::full_sphere()
        );
        assert_eq!(
            config.get_value::<LatLon>(keys::TILE_ORIGIN).unwrap(),
            LatLon::from_degrees(-90.0, -180.0)
        );
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let config = ElevationConfig::from_pairs([(keys::TILE_WIDTH, "wide")]);

        match config.get_value::<usize>(keys::TILE_HEIGHT) {
            Err(Error::MissingConfig { key }) => assert_eq!(key, keys::TILE_HEIGHT),
            other => panic!("expected MissingConfig, got {other:?}"),
        }
        match config.get_value::<usize>(keys::TILE_WIDTH) {
            Err(Error::InvalidConfig { key, .. }) => assert_eq!(key, keys::TILE_WIDTH),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        // A malformed value is not masked by a default.
        assert!(config.get_or::<usize>(keys::TILE_WIDTH, 10).is_err());
        assert_eq!(config.get_or::<usize>(keys::TILE_HEIGHT, 10).unwrap(), 10);
        assert_eq!(config.get_optional::<usize>(keys::TILE_HEIGHT).unwrap(), None);
    }

    #[test]
    fn test_set_value_overrides() {
        let mut config = ElevationConfig::new();
        assert!(config.is_empty());
        config.set_value(keys::LEVEL_NUMBER, 3);
        config.set_value(keys::LEVEL_NUMBER, 4);
        assert_eq!(config.len(), 1);
        assert_eq!(config.get_value::<usize>(keys::LEVEL_NUMBER).unwrap(), 4);
    }

    #[test]
    fn test_from_json_mixed_scalars() {
        let config = ElevationConfig::from_json_str(
            r#"{
                "NUM_LEVELS": 5,
                "DETAIL_HINT": 0.25,
                "DATA_CACHE_NAME": "Earth/SRTM",
                "VERBOSE": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.get_value::<usize>(keys::NUM_LEVELS).unwrap(), 5);
        assert!((config.get_value::<f64>(keys::DETAIL_HINT).unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(
            config.get_value::<String>(keys::DATA_CACHE_NAME).unwrap(),
            "Earth/SRTM"
        );
        assert!(config.get_value::<bool>("VERBOSE").unwrap());

        assert!(ElevationConfig::from_json_str("[1, 2]").is_err());
        assert!(ElevationConfig::from_json_str(r#"{"A": {"nested": 1}}"#).is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(
            &path,
            r#"{"MODEL_STORE_PATH": "tiles", "ELEVATION_EXTREMES_FILE": "/abs/extremes_0.bin"}"#,
        )
        .unwrap();

        let config = ElevationConfig::load(&path).unwrap();
        let store: String = config.get_value(keys::MODEL_STORE_PATH).unwrap();
        assert_eq!(Path::new(&store), dir.path().join("tiles"));
        let extremes: String = config.get_value(keys::ELEVATION_EXTREMES_FILE).unwrap();
        assert_eq!(extremes, "/abs/extremes_0.bin");

        assert!(matches!(
            ElevationConfig::load(&dir.path().join("missing.json")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let mut config = ElevationConfig::new();
        config.set_value(keys::NUM_LEVELS, 4);
        config.set_value(keys::SECTOR, "-10 10 -20 20");
        config.save(&path).unwrap();

        let loaded = ElevationConfig::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_value::<usize>(keys::NUM_LEVELS).unwrap(), 4);
        assert_eq!(
            loaded.get_value::<Sector>(keys::SECTOR).unwrap(),
            Sector::from_degrees(-10.0, 10.0, -20.0, 20.0)
        );
    }
}
