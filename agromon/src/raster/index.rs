use serde::{Deserialize, Serialize};

use super::grid::{Raster, RasterError};
use super::{is_no_data, NO_DATA};

/// `(a - b) / (a + b)` clamped to `[-1, 1]`.
///
/// A zero denominator, a non-finite input or a [`NO_DATA`] input gives
/// [`NO_DATA`].
pub fn normalized_difference(a: f64, b: f64) -> f64 {
    if is_no_data(a) || is_no_data(b) {
        return NO_DATA;
    }
    let sum = a + b;
    if sum == 0.0 {
        return NO_DATA;
    }
    ((a - b) / sum).clamp(-1.0, 1.0)
}

/// Per-pixel normalized difference between two named bands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDifference {
    /// Band on the left of the difference (NIR for NDVI)
    pub positive: String,
    /// Band subtracted (red for NDVI)
    pub negative: String,
    /// Name of the derived band
    pub output: String,
}

impl NormalizedDifference {
    pub fn new(positive: &str, negative: &str, output: &str) -> Self {
        NormalizedDifference {
            positive: positive.to_string(),
            negative: negative.to_string(),
            output: output.to_string(),
        }
    }

    /// NDVI from a near-infrared and a red band
    pub fn ndvi(nir: &str, red: &str) -> Self {
        NormalizedDifference::new(nir, red, "NDVI")
    }

    pub fn input_bands(&self) -> [&str; 2] {
        [self.positive.as_str(), self.negative.as_str()]
    }

    /// Derive a single-band raster holding the index
    pub fn apply(&self, raster: &Raster) -> Result<Raster, RasterError> {
        if self.output == self.positive || self.output == self.negative {
            return Err(RasterError::BandNameClash(self.output.clone()));
        }
        let positive = raster.band(&self.positive)?;
        let negative = raster.band(&self.negative)?;

        let index: Vec<f64> = positive
            .iter()
            .zip(negative)
            .map(|(&a, &b)| normalized_difference(a, b))
            .collect();

        raster.empty_like().with_band(&self.output, index)
    }
}
