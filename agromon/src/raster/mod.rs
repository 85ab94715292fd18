//! Client-side raster model and the band math / reduction pipeline that the
//! in-process catalog runs: per-image normalized difference, temporal
//! composite, then spatial reduction at an explicit ground sampling distance.

pub mod composite;
pub mod grid;
pub mod index;
pub mod reduce;

pub use composite::{composite, TemporalReducer};
pub use grid::{Raster, RasterError};
pub use index::{normalized_difference, NormalizedDifference};
pub use reduce::{reduce_region, Scale};

/// Pixel value meaning "no data"
pub const NO_DATA: f64 = -999.0;

/// True for the sentinel and for any non-finite value
pub fn is_no_data(value: f64) -> bool {
    !value.is_finite() || value == NO_DATA
}
