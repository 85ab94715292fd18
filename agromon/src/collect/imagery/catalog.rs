use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::{BandMath, BandValues, ImageSet, ImageryService, ReduceRequest};
use crate::error::{CollectError, CollectResult};
use crate::geo_core::BoundingBox;
use crate::raster::{composite, reduce_region, Raster};

/// One image of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogImage {
    pub id: String,
    pub captured: NaiveDate,
    pub raster: Raster,
}

impl CatalogImage {
    pub fn footprint(&self) -> BoundingBox {
        self.raster.bbox()
    }
}

/// In-process image catalog running the whole filter / index / composite /
/// reduce pipeline locally.
///
/// Images of one collection are expected to share a grid; compositing images
/// on different grids fails with a configuration error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalCatalog {
    #[serde(default)]
    collections: BTreeMap<String, Vec<CatalogImage>>,
}

impl LocalCatalog {
    pub fn new() -> Self {
        LocalCatalog::default()
    }

    /// Load a JSON catalog: `{"collections": {"<id>": [<image>, ...]}}`
    pub fn load(path: &Path) -> CollectResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CollectError::config(format!("failed to read catalog {}: {}", path.display(), e))
        })?;
        let catalog = LocalCatalog::from_json(&content)?;
        debug!(
            path = %path.display(),
            collections = catalog.collections.len(),
            "Loaded local image catalog"
        );
        Ok(catalog)
    }

    pub fn from_json(content: &str) -> CollectResult<Self> {
        let catalog: LocalCatalog = serde_json::from_str(content)
            .map_err(|e| CollectError::config(format!("malformed catalog: {}", e)))?;
        for (collection, images) in &catalog.collections {
            for image in images {
                image.raster.validate().map_err(|e| {
                    CollectError::config(format!("{}/{}: {}", collection, image.id, e))
                })?;
            }
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, collection: &str, image: CatalogImage) -> CollectResult<()> {
        image.raster.validate()?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(image);
        Ok(())
    }

    /// Number of images held for `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, Vec::len)
    }

    /// Images matching the date and region predicates
    pub fn filter(&self, images: &ImageSet) -> Vec<&CatalogImage> {
        self.collections
            .get(&images.collection)
            .map(|all| {
                all.iter()
                    .filter(|image| images.period.contains(image.captured))
                    .filter(|image| images.region.intersects_bbox(&image.footprint()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ImageryService for LocalCatalog {
    fn count(&self, images: &ImageSet) -> CollectResult<usize> {
        Ok(self.filter(images).len())
    }

    fn reduce_region(&self, request: &ReduceRequest) -> CollectResult<BandValues> {
        let matched = self.filter(&request.images);
        let outputs = request.output_bands();
        if matched.is_empty() {
            debug!(collection = %request.images.collection, "Reduction over an empty image set");
            return Ok(outputs.into_iter().map(|band| (band, None)).collect());
        }

        let mut derived = Vec::with_capacity(matched.len());
        for image in matched {
            for band in &request.images.bands {
                image.raster.band(band)?;
            }
            let raster = match &request.band_math {
                BandMath::Select => {
                    let mut selected = image.raster.empty_like();
                    for band in &request.images.bands {
                        selected = selected.with_band(band, image.raster.band(band)?.to_vec())?;
                    }
                    selected
                }
                BandMath::NormalizedDifference(nd) => nd.apply(&image.raster)?,
            };
            derived.push(raster);
        }

        let mut values = BandValues::new();
        for band in outputs {
            let value = match composite(&derived, &band, request.temporal)? {
                Some(stacked) => {
                    reduce_region(&stacked, &band, &request.images.region, request.scale)?
                }
                None => None,
            };
            values.insert(band, value);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_core::{DateRange, Region};
    use crate::raster::{NormalizedDifference, Scale, TemporalReducer};
    use approx::assert_relative_eq;

    const COLLECTION: &str = "LANDSAT/LC08/C02/T1_L2";

    fn image(id: &str, date: &str, nir: f64, red: f64) -> CatalogImage {
        CatalogImage {
            id: id.to_string(),
            captured: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            raster: Raster::new(-47.95, -15.77, 30.0, 4, 4)
                .unwrap()
                .with_band("SR_B5", vec![nir; 16])
                .unwrap()
                .with_band("SR_B4", vec![red; 16])
                .unwrap(),
        }
    }

    fn catalog() -> LocalCatalog {
        let mut catalog = LocalCatalog::new();
        catalog.insert(COLLECTION, image("a", "2024-01-05", 0.5, 0.1)).unwrap();
        catalog.insert(COLLECTION, image("b", "2024-01-21", 0.3, 0.1)).unwrap();
        catalog.insert(COLLECTION, image("c", "2024-03-02", 0.9, 0.1)).unwrap();
        catalog
    }

    fn inside() -> Region {
        Region::point(-15.7702, -47.9498).unwrap()
    }

    fn ndvi_request(period: DateRange, region: Region) -> ReduceRequest {
        ReduceRequest {
            images: ImageSet::new(COLLECTION, period, region).select(&["SR_B5", "SR_B4"]),
            band_math: BandMath::NormalizedDifference(NormalizedDifference::ndvi("SR_B5", "SR_B4")),
            temporal: TemporalReducer::Mean,
            scale: Scale::metres(30.0).unwrap(),
        }
    }

    #[test]
    fn test_filter_by_date_and_region() {
        let catalog = catalog();
        let january = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let set = ImageSet::new(COLLECTION, january, inside());
        assert_eq!(catalog.count(&set).unwrap(), 2);

        let far_away = ImageSet::new(COLLECTION, january, Region::point(48.85, 2.35).unwrap());
        assert_eq!(catalog.count(&far_away).unwrap(), 0);

        let unknown = ImageSet::new("NOPE", january, inside());
        assert_eq!(catalog.count(&unknown).unwrap(), 0);
    }

    #[test]
    fn test_ndvi_mean_composite() {
        let catalog = catalog();
        let january = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let values = catalog.reduce_region(&ndvi_request(january, inside())).unwrap();
        // (0.4/0.6 + 0.2/0.4) / 2
        assert_relative_eq!(values["NDVI"].unwrap(), (2.0 / 3.0 + 0.5) / 2.0, max_relative = 1e-9);
    }

    #[test]
    fn test_empty_set_reduces_to_none() {
        let catalog = catalog();
        let period = DateRange::parse("2023-01-01", "2023-01-31").unwrap();
        let values = catalog.reduce_region(&ndvi_request(period, inside())).unwrap();
        assert_eq!(values.get("NDVI"), Some(&None));
    }

    #[test]
    fn test_select_keeps_requested_bands() {
        let catalog = catalog();
        let january = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let request = ReduceRequest {
            images: ImageSet::new(COLLECTION, january, inside()).select(&["SR_B4"]),
            band_math: BandMath::Select,
            temporal: TemporalReducer::Mean,
            scale: Scale::metres(30.0).unwrap(),
        };
        let values = catalog.reduce_region(&request).unwrap();
        assert_eq!(values.len(), 1);
        assert_relative_eq!(values["SR_B4"].unwrap(), 0.1, max_relative = 1e-9);
    }

    #[test]
    fn test_missing_band_is_configuration_error() {
        let catalog = catalog();
        let january = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let request = ReduceRequest {
            images: ImageSet::new(COLLECTION, january, inside()).select(&["TMP_2m"]),
            band_math: BandMath::Select,
            temporal: TemporalReducer::Mean,
            scale: Scale::metres(30.0).unwrap(),
        };
        assert!(matches!(
            catalog.reduce_region(&request),
            Err(CollectError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_json_validates_rasters() {
        let json = r#"{"collections": {"X": [{"id": "bad", "captured": "2024-01-01",
            "raster": {"origin_lon": 0.0, "origin_lat": 0.0, "pixel_size_m": 30.0,
                       "width": 2, "height": 2, "bands": {"B4": [0.1, 0.2]}}}]}}"#;
        assert!(matches!(
            LocalCatalog::from_json(json),
            Err(CollectError::Configuration(_))
        ));
        assert!(LocalCatalog::from_json("{").is_err());
        assert_eq!(LocalCatalog::from_json("{}").unwrap().len("X"), 0);
    }
}
