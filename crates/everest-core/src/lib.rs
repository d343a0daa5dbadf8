//! # everest-core
//!
//! EPIC Variability Extraction and Removal for Exoplanet Science Targets.
//!
//! This crate holds the light curve containers, the mission layer, the
//! data validation summary (DVS) layout, and the documentation search index
//! that describes the package's public surface.
//!
//! ## Layout
//!
//! - `constants`, `config`, `utils`: versioning, settings, logging
//! - `containers`: `TimeSeries`, `Aperture`, `Target`
//! - `mission`: the `Mission` trait and its K2 implementation
//! - `pld`: pixel level decorrelation entry point
//! - `dvs`: DVS page geometry and SVG rendering
//! - `search`, `formats`: the search index and its on-disk forms
//!
//! The library performs no network access; raw data is read from the local
//! cache.

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod constants;
pub mod containers;
pub mod dvs;
pub mod formats;
pub mod mission;
pub mod pld;
pub mod search;
pub mod types;
pub mod utils;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EverestError, Season, TargetId};

// =============================================================================
// RE-EXPORTS: Photometry
// =============================================================================

pub use config::Config;
pub use containers::{Aperture, Cube, RawData, Target, TimeSeries};
pub use dvs::{Dvs, DvsOptions, Layout, Panel};
pub use mission::{K2, Mission, mission_by_name};

// =============================================================================
// RE-EXPORTS: Search Index
// =============================================================================

pub use formats::{IndexFormat, index_checksum, index_from_bytes, index_to_bytes};
pub use search::{IndexBuilder, IntegrityReport, IntegrityViolation, SearchHit, SearchIndex};
