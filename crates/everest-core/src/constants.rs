//! # Constants
//!
//! General constants used throughout EVEREST.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Anything that depends on the environment (the data directory) is resolved
//! by [`crate::config::Config`] instead.

/// Alias for the EVEREST version number.
pub const EVEREST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The EVEREST core source code directory.
pub const EVEREST_SRC_DIR: &str = env!("CARGO_MANIFEST_DIR");

/// Environment variable overriding the top-level data directory.
pub const DATA_DIR_ENV: &str = "EVEREST3_DATA_DIR";

/// Default top-level data directory, relative to the home directory.
pub const DEFAULT_DATA_DIR: &str = "~/.everest3";

/// Kepler/K2 long cadence, in days (30 minutes).
pub const KEPLER_LONG_CADENCE: f64 = 1800.0 / 86400.0;

/// Kepler/K2 short cadence, in days (1 minute).
pub const KEPLER_SHORT_CADENCE: f64 = 60.0 / 86400.0;

/// The major.minor version number.
///
/// Drops the last dotted component of [`EVEREST_VERSION`].
#[must_use]
pub fn everest_major_minor() -> String {
    match EVEREST_VERSION.rsplit_once('.') {
        Some((major_minor, _)) => major_minor.to_string(),
        None => EVEREST_VERSION.to_string(),
    }
}

// =============================================================================
// SEARCH INDEX FORMATS
// =============================================================================

/// Magic bytes for the binary search index snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"EVSX";

/// Current binary snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const SNAPSHOT_VERSION: u8 = 1;

/// JavaScript wrapper emitted around a search index.
pub const SEARCH_INDEX_CALL: &str = "Search.setIndex";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a search index file accepted by the parsers (64 MB).
pub const MAX_INDEX_FILE_SIZE: usize = 64 * 1024 * 1024;

/// Maximum nesting depth of a JavaScript object literal.
///
/// Search indices nest four levels deep; anything far deeper is malformed.
pub const MAX_LITERAL_DEPTH: usize = 64;

/// Maximum number of words considered in a single search query.
pub const MAX_QUERY_WORDS: usize = 32;

/// Number of cadences per chunk in the scatter metric (~6.5 h at long cadence).
pub const SCATTER_WINDOW: usize = 13;
