//! # Containers
//!
//! Classes that store information about targets and their light curves:
//! - `Cube`: dense `(ncads, ncols, nrows)` pixel arrays
//! - `Aperture`: photometric aperture masks
//! - `TimeSeries`: a photometric time series on a postage stamp
//! - `Target`: a star, its mission, light curve and model
//! - `RawData`: the cached on-disk form of a target's raw photometry

mod aperture;
mod cube;
mod raw;
mod target;
mod timeseries;

pub use aperture::Aperture;
pub use cube::Cube;
pub use raw::{MAX_RAW_FILE_SIZE, RawData};
pub use target::Target;
pub use timeseries::TimeSeries;
