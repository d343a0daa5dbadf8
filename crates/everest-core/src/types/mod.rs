//! # Core Type Definitions
//!
//! Shared identifiers and the crate-wide error type:
//! - Target identifiers (`TargetId`) and observing seasons (`Season`)
//! - Error types (`EverestError`)
//!
//! Identifiers are plain data. They serialize untagged so that raw data files
//! may carry either `205071984` or `"EPIC 205071984"` as a target ID.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// TARGET IDENTIFIERS
// =============================================================================

/// Identifier of an observed target.
///
/// Catalog numbers (EPIC, KIC) are integers; anything else is kept as a name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetId {
    /// Numeric catalog identifier.
    Number(u64),
    /// Free-form identifier.
    Name(String),
}

impl TargetId {
    /// A file-system friendly rendition of the identifier.
    ///
    /// Path separators and whitespace are replaced by underscores.
    #[must_use]
    pub fn file_stem(&self) -> String {
        match self {
            TargetId::Number(n) => n.to_string(),
            TargetId::Name(name) => name
                .chars()
                .map(|c| {
                    if c.is_whitespace() || c == '/' || c == '\\' {
                        '_'
                    } else {
                        c
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetId::Number(n) => write!(f, "{}", n),
            TargetId::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for TargetId {
    fn from(n: u64) -> Self {
        TargetId::Number(n)
    }
}

impl From<&str> for TargetId {
    fn from(s: &str) -> Self {
        match s.trim().parse::<u64>() {
            Ok(n) => TargetId::Number(n),
            Err(_) => TargetId::Name(s.to_string()),
        }
    }
}

/// Season, quarter or campaign of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Season {
    /// Integer campaign or quarter number.
    Number(i64),
    /// Fractional campaign (K2 split campaigns such as 10.1).
    Fractional(f64),
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Number(n) => write!(f, "{}", n),
            Season::Fractional(x) => write!(f, "{}", x),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in EVEREST.
///
/// - No silent failures
/// - Use `Result<T, EverestError>` for fallible operations
/// - Library code never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum EverestError {
    /// An array does not have the shape an operation requires.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// An aperture mask does not match the postage stamp.
    #[error("Invalid aperture: {0}")]
    InvalidAperture(String),

    /// A DVS page layout could not be parsed.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// The configuration file is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The operation is not available for this mission or format.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A requested item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A search index failed its integrity checks.
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn target_id_parses_numbers() {
        assert_eq!(TargetId::from("205071984"), TargetId::Number(205071984));
        assert_eq!(
            TargetId::from("EPIC 205071984"),
            TargetId::Name("EPIC 205071984".to_string())
        );
    }

    #[test]
    fn target_id_file_stem() {
        assert_eq!(TargetId::Number(42).file_stem(), "42");
        assert_eq!(TargetId::from("EPIC 2/1").file_stem(), "EPIC_2_1");
    }

    #[test]
    fn target_id_untagged_json() {
        let n: TargetId = serde_json::from_str("205071984").unwrap();
        assert_eq!(n, TargetId::Number(205071984));
        let s: TargetId = serde_json::from_str("\"WASP-47\"").unwrap();
        assert_eq!(s, TargetId::Name("WASP-47".to_string()));
    }

    #[test]
    fn season_untagged_json() {
        let s: Season = serde_json::from_str("10.1").unwrap();
        assert_eq!(s, Season::Fractional(10.1));
        let s: Season = serde_json::from_str("6").unwrap();
        assert_eq!(s, Season::Number(6));
        assert_eq!(s.to_string(), "6");
    }
}
