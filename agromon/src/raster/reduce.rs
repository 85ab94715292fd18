use serde::{Deserialize, Serialize};

use super::grid::{Raster, RasterError};
use super::is_no_data;
use crate::geo_core::{BoundingBox, Region};

/// Ground sampling distance of a reduction, in metres.
///
/// Coarser scales average more native pixels into each cell, so the same
/// region yields a smoother (and generally different) scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scale(f64);

impl Scale {
    pub fn metres(metres: f64) -> Result<Self, RasterError> {
        if !metres.is_finite() || metres <= 0.0 {
            return Err(RasterError::InvalidScale(metres));
        }
        Ok(Scale(metres))
    }

    pub fn as_metres(self) -> f64 {
        self.0
    }
}

/// Finest accepted scale, as a fraction of the native pixel size
const MAX_OVERSAMPLING: f64 = 16.0;

/// Square cells of the requested scale laid over the raster.
///
/// A native pixel belongs to the cell holding its centre. Cell values are
/// computed on demand so no grid-sized buffer is ever allocated.
struct CellLayout {
    /// Cell size in native pixels
    ratio: f64,
    cols: usize,
    rows: usize,
}

impl CellLayout {
    fn new(raster: &Raster, scale: Scale) -> Result<Self, RasterError> {
        if scale.as_metres() * MAX_OVERSAMPLING < raster.pixel_size_m {
            return Err(RasterError::ScaleTooFine {
                scale: scale.as_metres(),
                native: raster.pixel_size_m,
            });
        }
        let ratio = scale.as_metres() / raster.pixel_size_m;
        Ok(CellLayout {
            ratio,
            cols: ((raster.width as f64 / ratio).ceil() as usize).max(1),
            rows: ((raster.height as f64 / ratio).ceil() as usize).max(1),
        })
    }

    /// Cell index along one axis for a fractional pixel coordinate
    fn cell_index(&self, pixel: f64, cells: usize) -> usize {
        ((pixel.max(0.0) / self.ratio) as usize).min(cells - 1)
    }

    /// Native pixels along one axis whose centres fall in `cell`
    fn pixel_span(
        &self,
        cell: usize,
        cells: usize,
        pixels: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        let lo = (cell as f64 * self.ratio - 1.0).max(0.0) as usize;
        let hi = if cell + 1 == cells {
            pixels
        } else {
            (((cell + 1) as f64 * self.ratio + 1.0).ceil() as usize).min(pixels)
        };
        (lo..hi).filter(move |&p| self.cell_index(p as f64 + 0.5, cells) == cell)
    }

    /// Mean of the valid pixels in the cell. A cell finer than the native grid
    /// holds no pixel centre and takes the pixel under its own centre.
    fn value(
        &self,
        raster: &Raster,
        data: &[f64],
        cell_col: usize,
        cell_row: usize,
    ) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for row in self.pixel_span(cell_row, self.rows, raster.height) {
            for col in self.pixel_span(cell_col, self.cols, raster.width) {
                let value = data[row * raster.width + col];
                if !is_no_data(value) {
                    sum += value;
                    count += 1;
                }
            }
        }
        if count > 0 {
            return Some(sum / count as f64);
        }

        let col = ((cell_col as f64 + 0.5) * self.ratio) as usize;
        let row = ((cell_row as f64 + 0.5) * self.ratio) as usize;
        if col < raster.width && row < raster.height {
            Some(data[row * raster.width + col]).filter(|v| !is_no_data(*v))
        } else {
            None
        }
    }

    fn cell_bbox(&self, raster: &Raster, cell_col: usize, cell_row: usize) -> BoundingBox {
        let (dlon, dlat) = raster.pixel_size_deg();
        let x0 = cell_col as f64 * self.ratio;
        let x1 = ((cell_col + 1) as f64 * self.ratio).min(raster.width as f64);
        let y0 = cell_row as f64 * self.ratio;
        let y1 = ((cell_row + 1) as f64 * self.ratio).min(raster.height as f64);
        BoundingBox::new(
            raster.origin_lon + x0 * dlon,
            raster.origin_lat - y1 * dlat,
            raster.origin_lon + x1 * dlon,
            raster.origin_lat - y0 * dlat,
        )
    }
}

/// Reduce `band` of `raster` to one scalar over `region` at `scale`.
///
/// A point takes the value of the cell containing it. A polygon takes the mean
/// of the cells it overlaps, each weighted by the overlapping area. Returns
/// `None` when the region covers no valid cell. Scales finer than a sixteenth
/// of the native pixel are rejected.
pub fn reduce_region(
    raster: &Raster,
    band: &str,
    region: &Region,
    scale: Scale,
) -> Result<Option<f64>, RasterError> {
    let data = raster.band(band)?;
    let layout = CellLayout::new(raster, scale)?;
    let (dlon, dlat) = raster.pixel_size_deg();
    let width = raster.width as f64;
    let height = raster.height as f64;

    match region {
        Region::Point(point) => {
            let px = (point.x() - raster.origin_lon) / dlon;
            let py = (raster.origin_lat - point.y()) / dlat;
            if px < 0.0 || py < 0.0 || px > width || py > height {
                return Ok(None);
            }
            let cell_col = layout.cell_index(px, layout.cols);
            let cell_row = layout.cell_index(py, layout.rows);
            Ok(layout.value(raster, data, cell_col, cell_row))
        }
        Region::Polygon(_) => {
            let region_bbox = region.bbox();
            let px0 = (region_bbox.min_x - raster.origin_lon) / dlon;
            let px1 = (region_bbox.max_x - raster.origin_lon) / dlon;
            let py0 = (raster.origin_lat - region_bbox.max_y) / dlat;
            let py1 = (raster.origin_lat - region_bbox.min_y) / dlat;
            if px1 < 0.0 || py1 < 0.0 || px0 > width || py0 > height {
                return Ok(None);
            }

            let cols = layout.cell_index(px0, layout.cols)..=layout.cell_index(px1, layout.cols);
            let rows = layout.cell_index(py0, layout.rows)..=layout.cell_index(py1, layout.rows);

            let mut weighted = 0.0;
            let mut total_weight = 0.0;
            for cell_row in rows {
                for cell_col in cols.clone() {
                    let cell = layout.cell_bbox(raster, cell_col, cell_row);
                    if !cell.intersects(&region_bbox) {
                        continue;
                    }
                    let weight = region.clipped_area(&cell);
                    if weight <= 0.0 {
                        continue;
                    }
                    if let Some(value) = layout.value(raster, data, cell_col, cell_row) {
                        weighted += weight * value;
                        total_weight += weight;
                    }
                }
            }
            if total_weight > 0.0 {
                Ok(Some(weighted / total_weight))
            } else {
                Ok(None)
            }
        }
    }
}
