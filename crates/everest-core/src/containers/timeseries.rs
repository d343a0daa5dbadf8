//! Photometric time series defined on a postage stamp.

use super::{Aperture, Cube};
use crate::EverestError;
use crate::mission::scatter_ppm;
use std::fmt;

/// A data container for a photometric time series on a postage stamp.
///
/// `flux` and `error` have shape `(ncads, ncols, nrows)`; `time` has one
/// entry per cadence (or is empty for a series without timestamps).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    time: Vec<f64>,
    flux: Cube,
    error: Cube,
}

impl TimeSeries {
    /// Create a time series. Missing errors default to zeros.
    pub fn new(time: Vec<f64>, flux: Cube, error: Option<Cube>) -> Result<Self, EverestError> {
        let error = match error {
            Some(error) => error,
            None => {
                let (ncads, ncols, nrows) = flux.shape();
                Cube::zeros(ncads, ncols, nrows)
            }
        };
        if error.shape() != flux.shape() {
            return Err(EverestError::InvalidShape(format!(
                "error shape {:?} differs from flux shape {:?}",
                error.shape(),
                flux.shape()
            )));
        }
        if !time.is_empty() && time.len() != flux.shape().0 {
            return Err(EverestError::InvalidShape(format!(
                "{} timestamps for {} cadences",
                time.len(),
                flux.shape().0
            )));
        }
        Ok(Self { time, flux, error })
    }

    /// The time array.
    #[must_use]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// The flux array, shape `(ncads, ncols, nrows)`.
    #[must_use]
    pub fn flux(&self) -> &Cube {
        &self.flux
    }

    /// The flux errors array, shape `(ncads, ncols, nrows)`.
    #[must_use]
    pub fn error(&self) -> &Cube {
        &self.error
    }

    /// The number of cadences.
    #[must_use]
    pub fn ncads(&self) -> usize {
        self.flux.shape().0
    }

    /// The number of columns in the postage stamp.
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.flux.shape().1
    }

    /// The number of rows in the postage stamp.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.flux.shape().2
    }

    /// Whether the series holds no cadences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ncads() == 0
    }

    /// Pixel fluxes inside an aperture, shape `(ncads, npix)`.
    ///
    /// `None` selects the entire postage stamp.
    pub fn pixel_flux(&self, aperture: Option<&Aperture>) -> Result<Vec<Vec<f64>>, EverestError> {
        self.collapse(&self.flux, aperture)
    }

    /// Pixel flux errors inside an aperture, shape `(ncads, npix)`.
    pub fn pixel_error(
        &self,
        aperture: Option<&Aperture>,
    ) -> Result<Vec<Vec<f64>>, EverestError> {
        self.collapse(&self.error, aperture)
    }

    /// Simple aperture photometry flux, shape `(ncads)`. NaN pixels are skipped.
    pub fn sap_flux(&self, aperture: Option<&Aperture>) -> Result<Vec<f64>, EverestError> {
        Ok(self
            .pixel_flux(aperture)?
            .iter()
            .map(|pixels| nansum(pixels.iter().copied()))
            .collect())
    }

    /// Simple aperture photometry errors, summed in quadrature, shape `(ncads)`.
    pub fn sap_error(&self, aperture: Option<&Aperture>) -> Result<Vec<f64>, EverestError> {
        Ok(self
            .pixel_error(aperture)?
            .iter()
            .map(|pixels| nansum(pixels.iter().map(|e| e * e)).sqrt())
            .collect())
    }

    /// Scatter metric of the SAP flux, in ppm.
    pub fn scatter(&self, aperture: Option<&Aperture>) -> Result<f64, EverestError> {
        scatter_ppm(&self.sap_flux(aperture)?)
    }

    fn collapse(
        &self,
        cube: &Cube,
        aperture: Option<&Aperture>,
    ) -> Result<Vec<Vec<f64>>, EverestError> {
        let indices = match aperture {
            Some(ap) => {
                ap.check_shape(self.ncols(), self.nrows())?;
                ap.indices()
            }
            None => (0..cube.frame_size()).collect(),
        };
        Ok(cube
            .frames()
            .map(|frame| indices.iter().filter_map(|&i| frame.get(i).copied()).collect())
            .collect())
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Timeseries of {} fluxes on a {} x {} pixel postage stamp>",
            self.ncads(),
            self.ncols(),
            self.nrows()
        )
    }
}

/// Sum ignoring NaN; an all-NaN input sums to zero.
pub(crate) fn nansum(values: impl Iterator<Item = f64>) -> f64 {
    values.filter(|v| !v.is_nan()).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    /// Two cadences on a 2 x 2 stamp.
    fn sample() -> TimeSeries {
        let flux = Cube::from_flat(2, 2, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN, 7.0, 8.0])
            .unwrap();
        let error =
            Cube::from_flat(2, 2, 2, vec![3.0, 4.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        TimeSeries::new(vec![0.0, 0.02], flux, Some(error)).unwrap()
    }

    #[test]
    fn shape_accessors() {
        let ts = sample();
        assert_eq!((ts.ncads(), ts.ncols(), ts.nrows()), (2, 2, 2));
        assert_eq!(
            ts.to_string(),
            "<Timeseries of 2 fluxes on a 2 x 2 pixel postage stamp>"
        );
    }

    #[test]
    fn default_error_is_zero() {
        let flux = Cube::zeros(3, 1, 1);
        let ts = TimeSeries::new(vec![], flux, None).unwrap();
        assert_eq!(ts.error().shape(), (3, 1, 1));
        assert_eq!(ts.sap_error(None).unwrap(), vec![0.0; 3]);
    }

    #[test]
    fn mismatched_error_shape_rejected() {
        let result = TimeSeries::new(vec![], Cube::zeros(2, 2, 2), Some(Cube::zeros(2, 2, 1)));
        assert!(matches!(result, Err(EverestError::InvalidShape(_))));
    }

    #[test]
    fn mismatched_time_rejected() {
        let result = TimeSeries::new(vec![0.0], Cube::zeros(2, 1, 1), None);
        assert!(matches!(result, Err(EverestError::InvalidShape(_))));
    }

    #[test]
    fn pixel_flux_follows_aperture() {
        let ts = sample();
        let ap = Aperture::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        assert_eq!(ts.pixel_flux(Some(&ap)).unwrap(), vec![vec![1.0, 4.0], vec![5.0, 8.0]]);
        assert_eq!(ts.pixel_flux(None).unwrap()[0], vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn sap_flux_skips_nan() {
        let ts = sample();
        assert_eq!(ts.sap_flux(None).unwrap(), vec![10.0, 20.0]);
    }

    #[test]
    fn sap_error_in_quadrature() {
        let ts = sample();
        let err = ts.sap_error(None).unwrap();
        assert!((err[0] - 5.0).abs() < 1e-12);
        assert!((err[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn wrong_aperture_shape_rejected() {
        let ts = sample();
        let ap = Aperture::full(3, 2);
        assert!(matches!(
            ts.sap_flux(Some(&ap)),
            Err(EverestError::InvalidAperture(_))
        ));
    }
}
