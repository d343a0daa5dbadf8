//! The `K2` mission.

use super::{Mission, scatter_ppm};
use crate::containers::{RawData, Target};
use crate::{EverestError, TargetId};

/// The mission name.
pub const NAME: &str = "K2";

/// The time unit for the mission.
pub const TIME_UNIT: &str = "BJD - 2454833";

/// The magnitude string for the mission.
pub const MAG_STR: &str = "Kp";

/// The Kepler `K2` mission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct K2;

impl K2 {
    /// A `K2` target with default season, magnitude and cadence.
    #[must_use]
    pub fn target(id: impl Into<TargetId>) -> Target {
        Target::new(id, Box::new(K2))
    }
}

impl Mission for K2 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn time_unit(&self) -> &'static str {
        TIME_UNIT
    }

    fn mag_str(&self) -> &'static str {
        MAG_STR
    }

    fn download(&self, id: &TargetId) -> Result<RawData, EverestError> {
        tracing::warn!("Download requested for K2 target {}", id);
        Err(EverestError::Unsupported(format!(
            "downloading K2 data for {} is not implemented; place a raw data file in the target directory",
            id
        )))
    }

    fn scatter(&self, _time: &[f64], flux: &[f64]) -> Result<f64, EverestError> {
        scatter_ppm(flux)
    }
}
