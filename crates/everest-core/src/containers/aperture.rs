//! Photometric aperture masks.

use crate::EverestError;
use serde::{Deserialize, Serialize};

/// An integer mask of shape `(ncols, nrows)` over a postage stamp.
///
/// A pixel belongs to the aperture when its lowest bit is set, so mission
/// bitmasks (where bit 0 marks "collected") can be used directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i32>>", into = "Vec<Vec<i32>>")]
pub struct Aperture {
    ncols: usize,
    nrows: usize,
    mask: Vec<i32>,
}

impl Aperture {
    /// An aperture covering the whole postage stamp.
    #[must_use]
    pub fn full(ncols: usize, nrows: usize) -> Self {
        Self {
            ncols,
            nrows,
            mask: vec![1; ncols * nrows],
        }
    }

    /// Build an aperture from `[column][row]` vectors.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, EverestError> {
        let ncols = rows.len();
        let nrows = rows.first().map_or(0, Vec::len);
        let mut mask = Vec::with_capacity(ncols * nrows);
        for (i, column) in rows.into_iter().enumerate() {
            if column.len() != nrows {
                return Err(EverestError::InvalidAperture(format!(
                    "column {} has {} entries, expected {}",
                    i,
                    column.len(),
                    nrows
                )));
            }
            mask.extend(column);
        }
        Ok(Self { ncols, nrows, mask })
    }

    /// `(ncols, nrows)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.ncols, self.nrows)
    }

    /// Whether the pixel at `(col, row)` is inside the aperture.
    #[must_use]
    pub fn contains(&self, col: usize, row: usize) -> bool {
        col < self.ncols
            && row < self.nrows
            && self
                .mask
                .get(col * self.nrows + row)
                .is_some_and(|v| v & 1 != 0)
    }

    /// Flat frame indices of the pixels inside the aperture, in C order.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, v)| *v & 1 != 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of pixels inside the aperture.
    #[must_use]
    pub fn npix(&self) -> usize {
        self.mask.iter().filter(|v| *v & 1 != 0).count()
    }

    /// Check that the aperture fits a `(ncols, nrows)` stamp.
    pub fn check_shape(&self, ncols: usize, nrows: usize) -> Result<(), EverestError> {
        if self.shape() != (ncols, nrows) {
            return Err(EverestError::InvalidAperture(format!(
                "aperture has shape ({}, {}), postage stamp is ({}, {})",
                self.ncols, self.nrows, ncols, nrows
            )));
        }
        Ok(())
    }
}

impl TryFrom<Vec<Vec<i32>>> for Aperture {
    type Error = EverestError;

    fn try_from(rows: Vec<Vec<i32>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Aperture> for Vec<Vec<i32>> {
    fn from(aperture: Aperture) -> Self {
        if aperture.nrows == 0 {
            return vec![Vec::new(); aperture.ncols];
        }
        aperture
            .mask
            .chunks(aperture.nrows)
            .map(<[i32]>::to_vec)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn lowest_bit_selects_pixels() {
        let ap = Aperture::from_rows(vec![vec![1, 0, 3], vec![2, 5, 0]]).unwrap();
        assert_eq!(ap.shape(), (2, 3));
        assert!(ap.contains(0, 0));
        assert!(!ap.contains(1, 0)); // 2 has bit 0 unset
        assert!(ap.contains(1, 1));
        assert_eq!(ap.indices(), vec![0, 2, 4]);
        assert_eq!(ap.npix(), 3);
    }

    #[test]
    fn ragged_rows_rejected() {
        let result = Aperture::from_rows(vec![vec![1, 1], vec![1]]);
        assert!(matches!(result, Err(EverestError::InvalidAperture(_))));
    }

    #[test]
    fn serializes_as_nested_arrays() {
        let ap = Aperture::from_rows(vec![vec![1, 0], vec![0, 1]]).unwrap();
        let json = serde_json::to_string(&ap).unwrap();
        assert_eq!(json, "[[1,0],[0,1]]");
        let back: Aperture = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ap);
    }

    #[test]
    fn shape_check() {
        let ap = Aperture::full(3, 4);
        assert!(ap.check_shape(3, 4).is_ok());
        assert!(ap.check_shape(4, 3).is_err());
    }
}
