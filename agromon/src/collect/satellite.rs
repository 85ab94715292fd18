use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::imagery::{BandMath, ImageSet, ImageryService, ReduceRequest};
use super::global_variables::{
    DEFAULT_NDVI_SCALE_M, LANDSAT8_COLLECTION, SENTINEL2_COLLECTION,
};
use super::{CollectOutcome, Observation, Outcome};
use crate::error::CollectResult;
use crate::geo_core::{DateRange, Region};
use crate::raster::{NormalizedDifference, Scale, TemporalReducer};
use crate::settings::SatelliteSettings;

/// Optical sensors with a known red / near-infrared band pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    #[default]
    Landsat8,
    Sentinel2,
}

impl Sensor {
    pub fn collection(self) -> &'static str {
        match self {
            Sensor::Landsat8 => LANDSAT8_COLLECTION,
            Sensor::Sentinel2 => SENTINEL2_COLLECTION,
        }
    }

    pub fn nir_band(self) -> &'static str {
        match self {
            Sensor::Landsat8 => "SR_B5",
            Sensor::Sentinel2 => "B8",
        }
    }

    pub fn red_band(self) -> &'static str {
        match self {
            Sensor::Landsat8 => "SR_B4",
            Sensor::Sentinel2 => "B4",
        }
    }

    /// Native ground sampling distance of the red / NIR bands
    pub fn native_scale_m(self) -> f64 {
        match self {
            Sensor::Landsat8 => DEFAULT_NDVI_SCALE_M,
            Sensor::Sentinel2 => 10.0,
        }
    }

    pub fn ndvi(self) -> NormalizedDifference {
        NormalizedDifference::ndvi(self.nir_band(), self.red_band())
    }
}

/// Mean NDVI of a region over a period
///
/// Filters the collection, computes NDVI per image, averages the images per
/// pixel and reduces the composite over the region at the configured scale.
pub struct SatelliteCollector<S> {
    service: S,
    collection: String,
    index: NormalizedDifference,
    scale: Scale,
    temporal: TemporalReducer,
}

impl<S: ImageryService> SatelliteCollector<S> {
    pub fn new(service: S, settings: &SatelliteSettings) -> CollectResult<Self> {
        let collection = settings
            .collection
            .clone()
            .unwrap_or_else(|| settings.sensor.collection().to_string());
        Ok(SatelliteCollector {
            service,
            collection,
            index: settings.sensor.ndvi(),
            scale: Scale::metres(settings.effective_scale_m())?,
            temporal: settings.temporal,
        })
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip_all, fields(collection = %self.collection, start = %period.start(), end = %period.end()))]
    pub fn collect(&self, region: &Region, period: DateRange) -> CollectResult<CollectOutcome> {
        let images = ImageSet::new(&self.collection, period, region.clone())
            .select(&self.index.input_bands());

        let count = self.service.count(&images)?;
        if count == 0 {
            info!("No satellite images for the selected area and period");
            return Ok(Outcome::NoData);
        }

        let request = ReduceRequest {
            images,
            band_math: BandMath::NormalizedDifference(self.index.clone()),
            temporal: self.temporal,
            scale: self.scale,
        };
        let values = self.service.reduce_region(&request)?;

        match values.get(&self.index.output).copied().flatten() {
            Some(value) => {
                info!(images = count, value, "{} collected", self.index.output);
                Ok(Outcome::Observed(Observation::Index {
                    name: self.index.output.clone(),
                    period,
                    value,
                    images: count,
                }))
            }
            None => {
                info!(images = count, "Images matched but no valid pixel fell inside the region");
                Ok(Outcome::NoData)
            }
        }
    }

    /// One collection per window of `step_days` days
    pub fn collect_series(
        &self,
        region: &Region,
        period: DateRange,
        step_days: u32,
    ) -> CollectResult<Vec<(DateRange, CollectOutcome)>> {
        period
            .split(step_days)?
            .into_iter()
            .map(|window| Ok((window, self.collect(region, window)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::imagery::{BandValues, CatalogImage, LocalCatalog};
    use crate::error::{CollectError, RemoteFailure};
    use crate::raster::Raster;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use std::cell::Cell;

    const ORIGIN: (f64, f64) = (-47.95, -15.77);

    /// Field with bare soil on the west half and dense canopy on the east half
    fn field(date: &str) -> CatalogImage {
        let (width, height) = (8, 8);
        let mut nir = Vec::new();
        let mut red = Vec::new();
        for _row in 0..height {
            for col in 0..width {
                if col < 4 {
                    nir.push(0.25);
                    red.push(0.2);
                } else {
                    nir.push(0.45);
                    red.push(0.05);
                }
            }
        }
        CatalogImage {
            id: format!("LC08_{}", date),
            captured: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            raster: Raster::new(ORIGIN.0, ORIGIN.1, 30.0, width, height)
                .unwrap()
                .with_band("SR_B5", nir)
                .unwrap()
                .with_band("SR_B4", red)
                .unwrap(),
        }
    }

    fn catalog() -> LocalCatalog {
        let mut catalog = LocalCatalog::new();
        catalog.insert(LANDSAT8_COLLECTION, field("2024-01-09")).unwrap();
        catalog.insert(LANDSAT8_COLLECTION, field("2024-01-25")).unwrap();
        catalog
    }

    /// Polygon over pixel columns 1.0..5.5, all rows
    fn straddling_region(raster: &Raster) -> Region {
        let (dlon, _) = raster.pixel_size_deg();
        let bbox = raster.bbox();
        let west = raster.origin_lon + 1.0 * dlon;
        let east = raster.origin_lon + 5.5 * dlon;
        Region::polygon(&[
            (west, bbox.min_y),
            (east, bbox.min_y),
            (east, bbox.max_y),
            (west, bbox.max_y),
        ])
        .unwrap()
    }

    fn january() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_sensor_bands() {
        assert_eq!(Sensor::Landsat8.ndvi().input_bands(), ["SR_B5", "SR_B4"]);
        assert_eq!(Sensor::Sentinel2.collection(), SENTINEL2_COLLECTION);
        assert_eq!(Sensor::Sentinel2.native_scale_m(), 10.0);
    }

    #[test]
    fn test_scale_defaults_to_sensor_resolution() {
        let landsat = SatelliteCollector::new(catalog(), &SatelliteSettings::default()).unwrap();
        assert_eq!(landsat.scale().as_metres(), 30.0);

        let sentinel = SatelliteSettings {
            sensor: Sensor::Sentinel2,
            ..SatelliteSettings::default()
        };
        let collector = SatelliteCollector::new(catalog(), &sentinel).unwrap();
        assert_eq!(collector.scale().as_metres(), 10.0);
        assert_eq!(collector.collection(), SENTINEL2_COLLECTION);

        let pinned = SatelliteSettings {
            sensor: Sensor::Sentinel2,
            scale_m: Some(60.0),
            ..SatelliteSettings::default()
        };
        let collector = SatelliteCollector::new(catalog(), &pinned).unwrap();
        assert_eq!(collector.scale().as_metres(), 60.0);
    }

    #[test]
    fn test_scale_too_fine_is_configuration_error() {
        let collector = SatelliteCollector::new(catalog(), &SatelliteSettings::default())
            .unwrap()
            .with_scale(Scale::metres(0.001).unwrap());
        let region = straddling_region(&field("2024-01-09").raster);
        assert!(matches!(
            collector.collect(&region, january()),
            Err(CollectError::Configuration(_))
        ));
    }

    #[test]
    fn test_collect_ndvi() {
        let collector = SatelliteCollector::new(catalog(), &SatelliteSettings::default()).unwrap();
        let region = straddling_region(&field("2024-01-09").raster);
        let outcome = collector.collect(&region, january()).unwrap();

        let Outcome::Observed(Observation::Index { name, value, images, .. }) = outcome else {
            panic!("expected an observation, got {:?}", outcome);
        };
        assert_eq!(name, "NDVI");
        assert_eq!(images, 2);
        let soil = 0.05 / 0.45;
        let canopy = 0.4 / 0.5;
        assert_relative_eq!(value, (3.0 * soil + 1.5 * canopy) / 4.5, max_relative = 1e-6);
        assert!((-1.0..=1.0).contains(&value));
    }

    #[test]
    fn test_empty_period_is_no_data() {
        let collector = SatelliteCollector::new(catalog(), &SatelliteSettings::default()).unwrap();
        let region = straddling_region(&field("2024-01-09").raster);
        let period = DateRange::parse("2023-06-01", "2023-06-30").unwrap();
        assert_eq!(collector.collect(&region, period).unwrap(), Outcome::NoData);
    }

    #[test]
    fn test_region_outside_footprint_is_no_data() {
        let collector = SatelliteCollector::new(catalog(), &SatelliteSettings::default()).unwrap();
        let paris = Region::buffered_point(48.85, 2.35, 1000.0).unwrap();
        assert_eq!(collector.collect(&paris, january()).unwrap(), Outcome::NoData);
    }

    #[test]
    fn test_scale_changes_result() {
        let region = straddling_region(&field("2024-01-09").raster);
        let native = SatelliteCollector::new(catalog(), &SatelliteSettings::default())
            .unwrap()
            .collect(&region, january())
            .unwrap()
            .observed()
            .and_then(|obs| obs.get("NDVI"))
            .unwrap();
        let coarse = SatelliteCollector::new(catalog(), &SatelliteSettings::default())
            .unwrap()
            .with_scale(Scale::metres(240.0).unwrap())
            .collect(&region, january())
            .unwrap()
            .observed()
            .and_then(|obs| obs.get("NDVI"))
            .unwrap();
        // At 240 m the whole field is one cell holding the field mean
        let soil = 0.05 / 0.45;
        let canopy = 0.4 / 0.5;
        assert_relative_eq!(coarse, (soil + canopy) / 2.0, max_relative = 1e-9);
        assert!((native - coarse).abs() > 1e-3);
    }

    #[test]
    fn test_collect_series() {
        let collector = SatelliteCollector::new(catalog(), &SatelliteSettings::default()).unwrap();
        let region = straddling_region(&field("2024-01-09").raster);
        let period = DateRange::parse("2024-01-01", "2024-02-15").unwrap();
        let series = collector.collect_series(&region, period, 16).unwrap();
        assert_eq!(series.len(), 3);
        assert!(!series[0].1.is_no_data());
        assert!(!series[1].1.is_no_data());
        assert!(series[2].1.is_no_data());
    }

    /// Service that matches images but fails the reduction
    struct FailingReduce {
        reduce_calls: Cell<usize>,
    }

    impl ImageryService for FailingReduce {
        fn count(&self, _images: &ImageSet) -> CollectResult<usize> {
            Ok(3)
        }

        fn reduce_region(&self, _request: &ReduceRequest) -> CollectResult<BandValues> {
            self.reduce_calls.set(self.reduce_calls.get() + 1);
            Err(CollectError::remote("imagery", RemoteFailure::QuotaExceeded, "quota"))
        }
    }

    /// Service reporting an empty set; reducing it would be a bug
    struct EmptyService;

    impl ImageryService for EmptyService {
        fn count(&self, _images: &ImageSet) -> CollectResult<usize> {
            Ok(0)
        }

        fn reduce_region(&self, _request: &ReduceRequest) -> CollectResult<BandValues> {
            panic!("reduction attempted on an empty image set");
        }
    }

    #[test]
    fn test_remote_failure_is_surfaced() {
        let service = FailingReduce {
            reduce_calls: Cell::new(0),
        };
        let collector = SatelliteCollector::new(&service, &SatelliteSettings::default()).unwrap();
        let region = Region::point(-15.7801, -47.9382).unwrap();
        let err = collector.collect(&region, january()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(service.reduce_calls.get(), 1);
    }

    #[test]
    fn test_empty_count_skips_reduction() {
        let collector = SatelliteCollector::new(EmptyService, &SatelliteSettings::default()).unwrap();
        let region = Region::point(-15.7801, -47.9382).unwrap();
        assert_eq!(collector.collect(&region, january()).unwrap(), Outcome::NoData);
    }
}
