//! # Mission Module
//!
//! Mission or telescope-specific behavior. Each mission implements the
//! [`Mission`] trait; targets hold a boxed mission and ask it for paths,
//! labels, raw data and the scatter metric.

mod k2;

pub use k2::K2;

use crate::constants::SCATTER_WINDOW;
use crate::containers::RawData;
use crate::{Config, EverestError, TargetId};
use std::fmt;
use std::path::PathBuf;

/// A mission (telescope) that observed a target.
pub trait Mission: fmt::Debug + Send + Sync {
    /// The mission name.
    fn name(&self) -> &'static str;

    /// The time unit of the mission's timestamps.
    fn time_unit(&self) -> &'static str;

    /// The label of the mission's magnitude band.
    fn mag_str(&self) -> &'static str;

    /// The top-level mission data directory.
    fn path(&self, config: &Config) -> PathBuf {
        config.data_dir().join(self.name().to_lowercase())
    }

    /// Download the raw data for a target.
    fn download(&self, id: &TargetId) -> Result<RawData, EverestError>;

    /// Scatter metric of a light curve, in ppm.
    fn scatter(&self, time: &[f64], flux: &[f64]) -> Result<f64, EverestError>;
}

/// Look a mission up by name, case-insensitively.
pub fn mission_by_name(name: &str) -> Result<Box<dyn Mission>, EverestError> {
    match name.to_ascii_lowercase().as_str() {
        "k2" => Ok(Box::new(K2)),
        _ => Err(EverestError::NotFound(format!("Unknown mission: {}", name))),
    }
}

// =============================================================================
// SCATTER METRIC
// =============================================================================

/// Robust scatter of a light curve, in ppm.
///
/// The finite fluxes are normalized by their median and split into chunks of
/// [`SCATTER_WINDOW`] cadences. Each chunk contributes its standard
/// deviation divided by the square root of its length; the metric is the
/// median of those values.
pub fn scatter_ppm(flux: &[f64]) -> Result<f64, EverestError> {
    let finite: Vec<f64> = flux.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return Err(EverestError::InvalidShape(format!(
            "scatter needs at least 2 finite fluxes, got {}",
            finite.len()
        )));
    }

    let norm = median(&finite).unwrap_or(0.0);
    if norm == 0.0 {
        return Err(EverestError::InvalidShape(
            "median flux is zero; cannot normalize".to_string(),
        ));
    }
    let normalized: Vec<f64> = finite.iter().map(|v| v / norm).collect();

    let per_chunk: Vec<f64> = normalized
        .chunks(SCATTER_WINDOW)
        .filter(|chunk| chunk.len() >= 2)
        .map(|chunk| std_dev(chunk) / (chunk.len() as f64).sqrt())
        .collect();

    // The leading chunk always has >= 2 points, so per_chunk is never empty
    median(&per_chunk)
        .map(|m| m * 1.0e6)
        .ok_or_else(|| EverestError::InvalidShape("no chunk to measure".to_string()))
}

/// Median of finite values; `None` for an empty slice.
pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn flat_light_curve_has_zero_scatter() {
        let flux = vec![100.0; 50];
        assert_eq!(scatter_ppm(&flux).unwrap(), 0.0);
    }

    #[test]
    fn alternating_light_curve_scatter() {
        // +-1% around 1: std = 0.01 per 13-point chunk (approximately)
        let flux: Vec<f64> = (0..130)
            .map(|i| if i % 2 == 0 { 1.01 } else { 0.99 })
            .collect();
        let ppm = scatter_ppm(&flux).unwrap();
        // std of 13 alternating points ~ 0.00998, / sqrt(13) ~ 2768 ppm
        assert!(ppm > 2700.0 && ppm < 2800.0, "got {}", ppm);
    }

    #[test]
    fn nan_values_ignored() {
        let mut flux = vec![1.0; 20];
        flux[3] = f64::NAN;
        assert_eq!(scatter_ppm(&flux).unwrap(), 0.0);
    }

    #[test]
    fn too_few_points_rejected() {
        assert!(scatter_ppm(&[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn zero_median_rejected() {
        assert!(scatter_ppm(&[0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(mission_by_name("K2").unwrap().name(), "K2");
        assert_eq!(mission_by_name("k2").unwrap().name(), "K2");
        assert!(matches!(
            mission_by_name("tess"),
            Err(EverestError::NotFound(_))
        ));
    }
}
