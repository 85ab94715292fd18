//! The remote imagery seam: a catalog of images that can be filtered by
//! collection, date range and region, then reduced server-side to a handful of
//! scalars.

pub mod catalog;
pub mod remote;

pub use catalog::{CatalogImage, LocalCatalog};
pub use remote::RemoteImagery;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::CollectResult;
use crate::geo_core::{DateRange, Region};
use crate::raster::{NormalizedDifference, Scale, TemporalReducer};

/// Handle on the images of `collection` captured within `period` whose
/// footprint intersects `region`. Describes a filter; holds no pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSet {
    pub collection: String,
    pub period: DateRange,
    pub region: Region,
    /// Band selection, empty means every band
    pub bands: Vec<String>,
}

impl ImageSet {
    pub fn new(collection: &str, period: DateRange, region: Region) -> Self {
        ImageSet {
            collection: collection.to_string(),
            period,
            region,
            bands: Vec::new(),
        }
    }

    pub fn select(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|b| b.to_string()).collect();
        self
    }
}

/// Computation applied to every image before the temporal composite
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BandMath {
    /// Keep the selected bands as they are
    Select,
    NormalizedDifference(NormalizedDifference),
}

/// Filter, per-image band math, temporal composite, then spatial reduction
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceRequest {
    pub images: ImageSet,
    pub band_math: BandMath,
    pub temporal: TemporalReducer,
    pub scale: Scale,
}

impl ReduceRequest {
    /// Names of the bands the reduction reports
    pub fn output_bands(&self) -> Vec<String> {
        match &self.band_math {
            BandMath::Select => self.images.bands.clone(),
            BandMath::NormalizedDifference(nd) => vec![nd.output.clone()],
        }
    }
}

/// Band name to regional scalar; `None` where the region held no valid pixel
pub type BandValues = BTreeMap<String, Option<f64>>;

/// A service able to count and reduce filtered image sets
pub trait ImageryService {
    /// Number of images matching the filter
    fn count(&self, images: &ImageSet) -> CollectResult<usize>;

    /// Run the reduction and bring the resulting scalars back to the client
    fn reduce_region(&self, request: &ReduceRequest) -> CollectResult<BandValues>;
}

impl<T: ImageryService + ?Sized> ImageryService for Box<T> {
    fn count(&self, images: &ImageSet) -> CollectResult<usize> {
        (**self).count(images)
    }

    fn reduce_region(&self, request: &ReduceRequest) -> CollectResult<BandValues> {
        (**self).reduce_region(request)
    }
}

impl<T: ImageryService + ?Sized> ImageryService for &T {
    fn count(&self, images: &ImageSet) -> CollectResult<usize> {
        (**self).count(images)
    }

    fn reduce_region(&self, request: &ReduceRequest) -> CollectResult<BandValues> {
        (**self).reduce_region(request)
    }
}
