//! Cached raw data files.
//!
//! Raw target data lives next to the target's other products as
//! `<id>_raw.json`. Missing pixel values are stored as JSON `null`.

use super::{Aperture, Cube, TimeSeries};
use crate::{EverestError, Season, TargetId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum size of a raw data file (256 MB).
pub const MAX_RAW_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// On-disk record of a target's raw photometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawData {
    /// Target identifier.
    pub id: TargetId,
    /// Season, quarter or campaign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
    /// Magnitude in the mission band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<f64>,
    /// Observation cadence in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    /// Timestamps, one per cadence.
    pub time: Vec<f64>,
    /// Pixel fluxes, `[cadence][column][row]`.
    pub flux: Vec<Vec<Vec<Option<f64>>>>,
    /// Pixel flux errors, same layout as `flux`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<Vec<Vec<Option<f64>>>>>,
    /// Photometric aperture, `[column][row]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aperture: Option<Aperture>,
}

impl RawData {
    /// Read a raw data file.
    pub fn load(path: &Path) -> Result<Self, EverestError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            EverestError::IoError(format!("Cannot stat '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_RAW_FILE_SIZE {
            return Err(EverestError::DeserializationError(format!(
                "File size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_RAW_FILE_SIZE
            )));
        }
        let bytes = std::fs::read(path).map_err(|e| {
            EverestError::IoError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            EverestError::DeserializationError(format!("{}: {}", path.display(), e))
        })
    }

    /// Write a raw data file.
    pub fn save(&self, path: &Path) -> Result<(), EverestError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| EverestError::SerializationError(e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| {
            EverestError::IoError(format!("Cannot write '{}': {}", path.display(), e))
        })
    }

    /// Build the light curve held by this record.
    pub fn lightcurve(&self) -> Result<TimeSeries, EverestError> {
        let flux = Cube::from_nested(&self.flux)?;
        let error = self.error.as_deref().map(Cube::from_nested).transpose()?;
        TimeSeries::new(self.time.clone(), flux, error)
    }

    /// Capture a light curve into a record.
    #[must_use]
    pub fn from_lightcurve(id: TargetId, lightcurve: &TimeSeries) -> Self {
        Self {
            id,
            season: None,
            mag: None,
            cadence: None,
            time: lightcurve.time().to_vec(),
            flux: lightcurve.flux().to_nested(),
            error: Some(lightcurve.error().to_nested()),
            aperture: None,
        }
    }
}
