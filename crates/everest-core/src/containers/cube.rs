//! Dense `(ncads, ncols, nrows)` pixel cube.

use crate::EverestError;

/// A dense 3-D array of `f64` indexed by `(cadence, column, row)`.
///
/// Storage is C-ordered: one contiguous `(ncols, nrows)` frame per cadence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cube {
    shape: (usize, usize, usize),
    data: Vec<f64>,
}

impl Cube {
    /// A cube of zeros.
    #[must_use]
    pub fn zeros(ncads: usize, ncols: usize, nrows: usize) -> Self {
        Self {
            shape: (ncads, ncols, nrows),
            data: vec![0.0; ncads * ncols * nrows],
        }
    }

    /// Build a cube from flat C-ordered data.
    pub fn from_flat(
        ncads: usize,
        ncols: usize,
        nrows: usize,
        data: Vec<f64>,
    ) -> Result<Self, EverestError> {
        let expected = ncads * ncols * nrows;
        if data.len() != expected {
            return Err(EverestError::InvalidShape(format!(
                "{} values cannot fill a ({}, {}, {}) cube",
                data.len(),
                ncads,
                ncols,
                nrows
            )));
        }
        Ok(Self {
            shape: (ncads, ncols, nrows),
            data,
        })
    }

    /// Build a cube from nested `[cadence][column][row]` vectors.
    ///
    /// `None` entries (JSON `null`) become NaN.
    pub fn from_nested(frames: &[Vec<Vec<Option<f64>>>]) -> Result<Self, EverestError> {
        let ncads = frames.len();
        let ncols = frames.first().map_or(0, Vec::len);
        let nrows = frames
            .first()
            .and_then(|frame| frame.first())
            .map_or(0, Vec::len);

        let mut data = Vec::with_capacity(ncads * ncols * nrows);
        for (c, frame) in frames.iter().enumerate() {
            if frame.len() != ncols {
                return Err(EverestError::InvalidShape(format!(
                    "cadence {} has {} columns, expected {}",
                    c,
                    frame.len(),
                    ncols
                )));
            }
            for (i, column) in frame.iter().enumerate() {
                if column.len() != nrows {
                    return Err(EverestError::InvalidShape(format!(
                        "cadence {} column {} has {} rows, expected {}",
                        c,
                        i,
                        column.len(),
                        nrows
                    )));
                }
                data.extend(column.iter().map(|v| v.unwrap_or(f64::NAN)));
            }
        }
        Self::from_flat(ncads, ncols, nrows, data)
    }

    /// Convert back to nested vectors, NaN becoming `None`.
    #[must_use]
    pub fn to_nested(&self) -> Vec<Vec<Vec<Option<f64>>>> {
        let (_, ncols, nrows) = self.shape;
        self.frames()
            .map(|frame| {
                (0..ncols)
                    .map(|col| {
                        frame
                            .get(col * nrows..(col + 1) * nrows)
                            .unwrap_or(&[])
                            .iter()
                            .map(|&v| if v.is_nan() { None } else { Some(v) })
                            .collect()
                    })
                    .collect()
            })
            .collect()
    }

    /// `(ncads, ncols, nrows)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        self.shape
    }

    /// Value at `(cadence, column, row)`, if in range.
    #[must_use]
    pub fn get(&self, cadence: usize, col: usize, row: usize) -> Option<f64> {
        let (ncads, ncols, nrows) = self.shape;
        if cadence >= ncads || col >= ncols || row >= nrows {
            return None;
        }
        self.data
            .get(cadence * ncols * nrows + col * nrows + row)
            .copied()
    }

    /// The flat `(ncols, nrows)` frame of one cadence.
    #[must_use]
    pub fn frame(&self, cadence: usize) -> Option<&[f64]> {
        let size = self.frame_size();
        if cadence >= self.shape.0 {
            return None;
        }
        self.data.get(cadence * size..(cadence + 1) * size)
    }

    /// Iterate over the frames in cadence order.
    pub fn frames(&self) -> impl Iterator<Item = &[f64]> {
        let size = self.frame_size();
        let ncads = self.shape.0;
        (0..ncads).map(move |c| self.data.get(c * size..(c + 1) * size).unwrap_or(&[]))
    }

    /// Number of pixels in one frame.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.shape.1 * self.shape.2
    }
}
