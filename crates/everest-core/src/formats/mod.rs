//! # Formats
//!
//! On-disk forms of a search index:
//! - `js`: `Search.setIndex({...})`, as written by documentation builders
//! - `json`: the same object as plain JSON
//! - `binary`: a checksummed `postcard` snapshot (`.evx`)

pub mod literal;
pub mod searchindex_js;
pub mod snapshot;

pub use literal::parse_literal;
pub use snapshot::{
    CanonicalIndex, MAX_SNAPSHOT_DOCUMENTS, MAX_SNAPSHOT_OBJECTS, SnapshotHeader,
    index_checksum, index_from_bytes, index_to_bytes, verify_snapshot,
};

#[cfg(feature = "crypto-hash")]
pub use snapshot::{compute_blake3_hash, index_crypto_hash, verify_crypto_hash};

use crate::EverestError;
use crate::constants::MAX_INDEX_FILE_SIZE;
use crate::search::SearchIndex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A search index file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Js,
    Json,
    Binary,
}

impl IndexFormat {
    /// Format implied by a file extension: `.js`, `.json` or `.evx`.
    pub fn from_path(path: &Path) -> Result<Self, EverestError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("js") => Ok(IndexFormat::Js),
            Some("json") => Ok(IndexFormat::Json),
            Some("evx") => Ok(IndexFormat::Binary),
            _ => Err(EverestError::Unsupported(format!(
                "cannot tell the index format of '{}' (expected .js, .json or .evx)",
                path.display()
            ))),
        }
    }
}

impl FromStr for IndexFormat {
    type Err = EverestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" => Ok(IndexFormat::Js),
            "json" => Ok(IndexFormat::Json),
            "binary" | "evx" => Ok(IndexFormat::Binary),
            other => Err(EverestError::Unsupported(format!(
                "index format '{}' (expected js, json or binary)",
                other
            ))),
        }
    }
}

impl fmt::Display for IndexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexFormat::Js => f.write_str("js"),
            IndexFormat::Json => f.write_str("json"),
            IndexFormat::Binary => f.write_str("binary"),
        }
    }
}

/// Encode an index in the given format.
pub fn encode_index(index: &SearchIndex, format: IndexFormat) -> Result<Vec<u8>, EverestError> {
    match format {
        IndexFormat::Js => searchindex_js::to_js(index).map(String::into_bytes),
        IndexFormat::Json => searchindex_js::to_json(index).map(String::into_bytes),
        IndexFormat::Binary => index_to_bytes(index),
    }
}

/// Decode an index in the given format.
pub fn decode_index(data: &[u8], format: IndexFormat) -> Result<SearchIndex, EverestError> {
    match format {
        IndexFormat::Binary => index_from_bytes(data),
        IndexFormat::Js | IndexFormat::Json => {
            let text = std::str::from_utf8(data).map_err(|e| {
                EverestError::DeserializationError(format!("index is not UTF-8: {}", e))
            })?;
            searchindex_js::parse(text)
        }
    }
}

/// Read an index file, choosing the format from its extension.
pub fn load_index(path: &Path) -> Result<SearchIndex, EverestError> {
    let format = IndexFormat::from_path(path)?;
    let metadata = std::fs::metadata(path)
        .map_err(|e| EverestError::IoError(format!("{}: {}", path.display(), e)))?;
    if metadata.len() > MAX_INDEX_FILE_SIZE as u64 {
        return Err(EverestError::IoError(format!(
            "{} is {} bytes, maximum allowed is {}",
            path.display(),
            metadata.len(),
            MAX_INDEX_FILE_SIZE
        )));
    }
    let data = std::fs::read(path)
        .map_err(|e| EverestError::IoError(format!("{}: {}", path.display(), e)))?;
    let index = decode_index(&data, format)?;
    tracing::debug!(
        "Loaded {} index from {}: {}",
        format,
        path.display(),
        index.stats()
    );
    Ok(index)
}

/// Write an index file in the given format.
pub fn save_index(index: &SearchIndex, path: &Path, format: IndexFormat) -> Result<(), EverestError> {
    let data = encode_index(index, format)?;
    std::fs::write(path, data)
        .map_err(|e| EverestError::IoError(format!("{}: {}", path.display(), e)))?;
    tracing::info!("Saved {} index to {}", format, path.display());
    Ok(())
}
