use serde::{Deserialize, Serialize};

use super::grid::{Raster, RasterError};
use super::{is_no_data, NO_DATA};
use crate::commons::basic_functions::{mean, median};

/// Statistic collapsing a stack of images into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalReducer {
    #[default]
    Mean,
    Median,
}

impl TemporalReducer {
    pub fn reduce(self, values: &[f64]) -> Option<f64> {
        match self {
            TemporalReducer::Mean => mean(values),
            TemporalReducer::Median => median(values),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TemporalReducer::Mean => "mean",
            TemporalReducer::Median => "median",
        }
    }
}

/// Per-pixel composite of `band` across `rasters`, skipping no-data pixels.
///
/// Returns `None` for an empty stack. All rasters must share one grid.
pub fn composite(
    rasters: &[Raster],
    band: &str,
    reducer: TemporalReducer,
) -> Result<Option<Raster>, RasterError> {
    let Some(first) = rasters.first() else {
        return Ok(None);
    };
    if rasters.iter().any(|r| !r.same_grid(first)) {
        return Err(RasterError::GridMismatch);
    }
    let stack = rasters
        .iter()
        .map(|r| r.band(band))
        .collect::<Result<Vec<_>, _>>()?;

    let mut pixel_values = Vec::with_capacity(stack.len());
    let mut out = Vec::with_capacity(first.len());
    for i in 0..first.len() {
        pixel_values.clear();
        pixel_values.extend(stack.iter().map(|data| data[i]).filter(|v| !is_no_data(*v)));
        out.push(reducer.reduce(&pixel_values).unwrap_or(NO_DATA));
    }

    Ok(Some(first.empty_like().with_band(band, out)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn image(values: Vec<f64>) -> Raster {
        Raster::new(0.0, 0.0, 30.0, 3, 1)
            .unwrap()
            .with_band("NDVI", values)
            .unwrap()
    }

    #[test]
    fn test_empty_stack() {
        assert_eq!(composite(&[], "NDVI", TemporalReducer::Mean), Ok(None));
    }

    #[test]
    fn test_mean_skips_no_data() {
        let stack = vec![
            image(vec![0.2, NO_DATA, NO_DATA]),
            image(vec![0.4, 0.6, NO_DATA]),
        ];
        let out = composite(&stack, "NDVI", TemporalReducer::Mean).unwrap().unwrap();
        let values = out.band("NDVI").unwrap();
        assert_relative_eq!(values[0], 0.3, max_relative = 1e-9);
        assert_eq!(values[1], 0.6);
        assert_eq!(values[2], NO_DATA);
    }

    #[test]
    fn test_median() {
        let stack = vec![
            image(vec![0.1, 0.0, 0.0]),
            image(vec![0.9, 0.0, 0.0]),
            image(vec![0.2, 0.0, 0.0]),
        ];
        let out = composite(&stack, "NDVI", TemporalReducer::Median).unwrap().unwrap();
        assert_eq!(out.band("NDVI").unwrap()[0], 0.2);
    }

    #[test]
    fn test_grid_mismatch() {
        let other = Raster::new(1.0, 0.0, 30.0, 3, 1)
            .unwrap()
            .with_band("NDVI", vec![0.0; 3])
            .unwrap();
        assert_eq!(
            composite(&[image(vec![0.0; 3]), other], "NDVI", TemporalReducer::Mean),
            Err(RasterError::GridMismatch)
        );
    }
}
