//! Error types for parsing geodetic values from text.

use std::fmt;

/// Errors that can occur while parsing angles, locations or sectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The text had the wrong number of components.
    ComponentCount {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A component was not a valid number.
    InvalidNumber {
        context: &'static str,
        detail: String,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComponentCount {
                context,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "invalid {context}: expected {expected} components, got {actual}"
                )
            }
            Self::InvalidNumber { context, detail } => {
                write!(f, "invalid number in {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Split `text` on commas and whitespace and parse exactly `N` degree values.
pub(crate) fn parse_degrees<const N: usize>(
    text: &str,
    context: &'static str,
) -> Result<[f64; N], ParseError> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != N {
        return Err(ParseError::ComponentCount {
            context,
            expected: N,
            actual: parts.len(),
        });
    }

    let mut values = [0.0; N];
    for (value, part) in values.iter_mut().zip(parts) {
        *value = part.parse().map_err(|e| ParseError::InvalidNumber {
            context,
            detail: format!("'{part}': {e}"),
        })?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_degrees_mixed_separators() {
        let values: [f64; 4] = parse_degrees("-90, 90 -180,180", "sector").unwrap();
        assert_eq!(values, [-90.0, 90.0, -180.0, 180.0]);
    }

    #[test]
    fn test_parse_degrees_wrong_count() {
        let result: Result<[f64; 2], _> = parse_degrees("1 2 3", "lat/lon");
        assert_eq!(
            result,
            Err(ParseError::ComponentCount {
                context: "lat/lon",
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn test_parse_degrees_bad_number() {
        let result: Result<[f64; 2], _> = parse_degrees("1 north", "lat/lon");
        assert!(matches!(result, Err(ParseError::InvalidNumber { .. })));
    }
}
