//! On-disk sample formats.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Sample type of a raw elevation raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int16,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    #[must_use]
    pub fn size_in_bytes(self) -> usize {
        match self {
            DataType::Int16 => 2,
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Float64 => 8,
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    /// Accepts the bare name (`"Int16"`) or a dotted identifier ending in
    /// it (`"avkey.Int16"`), case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.rsplit('.').next().unwrap_or(s).trim();
        match name.to_ascii_lowercase().as_str() {
            "int16" => Ok(DataType::Int16),
            "int32" => Ok(DataType::Int32),
            "float32" => Ok(DataType::Float32),
            "float64" => Ok(DataType::Float64),
            _ => Err(format!("unknown sample type {s:?}")),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.rsplit('.').next().unwrap_or(s).trim();
        match name.to_ascii_lowercase().as_str() {
            "littleendian" | "little_endian" | "little" => Ok(ByteOrder::LittleEndian),
            "bigendian" | "big_endian" | "big" => Ok(ByteOrder::BigEndian),
            _ => Err(format!("unknown byte order {s:?}")),
        }
    }
}

/// A validated tile encoding. Only little-endian data can be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    data_type: DataType,
}

impl SampleFormat {
    /// Validate a declared encoding.
    ///
    /// Big-endian rasters are rejected with [`Error::UnsupportedFormat`].
    pub fn new(data_type: DataType, byte_order: ByteOrder) -> Result<Self> {
        if byte_order != ByteOrder::LittleEndian {
            return Err(Error::UnsupportedFormat {
                context: "byte order",
                detail: format!("{byte_order:?}"),
            });
        }
        Ok(Self { data_type })
    }

    /// Parse the `DATA_TYPE` and `BYTE_ORDER` values of a dataset.
    ///
    /// Unknown names are unsupported formats rather than config typos:
    /// either way the dataset cannot be decoded.
    pub fn parse(data_type: &str, byte_order: &str) -> Result<Self> {
        let data_type = data_type
            .parse::<DataType>()
            .map_err(|detail| Error::UnsupportedFormat {
                context: "sample type",
                detail,
            })?;
        let byte_order = byte_order
            .parse::<ByteOrder>()
            .map_err(|detail| Error::UnsupportedFormat {
                context: "byte order",
                detail,
            })?;
        Self::new(data_type, byte_order)
    }

    #[must_use]
    pub fn data_type(self) -> DataType {
        self.data_type
    }

    /// Decode a row-major raster of exactly `count` samples into `f32`.
    ///
    /// Returns `None` when the buffer length does not match.
    #[must_use]
    pub fn decode(self, bytes: &[u8], count: usize) -> Option<Vec<f32>> {
        let size = self.data_type.size_in_bytes();
        if bytes.len() != count * size {
            return None;
        }

        let chunks = bytes.chunks_exact(size);
        let samples = match self.data_type {
            DataType::Int16 => chunks
                .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])))
                .collect(),
            DataType::Int32 => chunks
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
                .collect(),
            DataType::Float32 => chunks
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            DataType::Float64 => chunks
                .map(|c| {
                    f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
                })
                .collect(),
        };
        Some(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("Int16".parse::<DataType>().unwrap(), DataType::Int16);
        assert_eq!("avkey.float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert!("Int8".parse::<DataType>().is_err());
        assert_eq!(
            "LittleEndian".parse::<ByteOrder>().unwrap(),
            ByteOrder::LittleEndian
        );
    }

    #[test]
    fn test_big_endian_is_unsupported() {
        let result = SampleFormat::parse("Int16", "BigEndian");
        assert!(matches!(
            result,
            Err(Error::UnsupportedFormat {
                context: "byte order",
                ..
            })
        ));
        assert!(matches!(
            SampleFormat::parse("UInt8", "LittleEndian"),
            Err(Error::UnsupportedFormat {
                context: "sample type",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_int16() {
        let format = SampleFormat::new(DataType::Int16, ByteOrder::LittleEndian).unwrap();
        let bytes: Vec<u8> = [-32768i16, -1, 0, 8848]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        assert_eq!(
            format.decode(&bytes, 4).unwrap(),
            vec![-32768.0, -1.0, 0.0, 8848.0]
        );
        assert!(format.decode(&bytes, 3).is_none());
    }

    #[test]
    fn test_decode_floats() {
        let f32_format = SampleFormat::new(DataType::Float32, ByteOrder::LittleEndian).unwrap();
        let bytes: Vec<u8> = [1.5f32, -2.25].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(f32_format.decode(&bytes, 2).unwrap(), vec![1.5, -2.25]);

        let f64_format = SampleFormat::new(DataType::Float64, ByteOrder::LittleEndian).unwrap();
        let bytes: Vec<u8> = [100.5f64].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(f64_format.decode(&bytes, 1).unwrap(), vec![100.5]);

        let i32_format = SampleFormat::new(DataType::Int32, ByteOrder::LittleEndian).unwrap();
        let bytes: Vec<u8> = [-400i32].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(i32_format.decode(&bytes, 1).unwrap(), vec![-400.0]);
    }
}
