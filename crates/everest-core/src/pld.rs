//! # PLD Module
//!
//! Pixel level decorrelation (PLD) de-trending entry point.
//!
//! `detrend` assigns the systematics model of a target. The model is
//! currently flat (all zeros), so the de-trended flux equals the SAP flux.

use crate::EverestError;
use crate::containers::Target;

/// De-trend a target's light curve with PLD.
///
/// The target must hold data (see [`Target::get_raw_data`]).
pub fn detrend(target: &mut Target) -> Result<(), EverestError> {
    let ncads = target.lightcurve().ncads();
    if ncads == 0 {
        return Err(EverestError::NotFound(format!(
            "no light curve data for target {}",
            target.id()
        )));
    }

    tracing::info!(
        "De-trending {} target {} ({} cadences)",
        target.mission().name(),
        target.id(),
        ncads
    );

    target.set_model(vec![0.0; ncads])?;

    tracing::debug!("Model assigned for target {}", target.id());
    Ok(())
}
