use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

use super::imagery::{BandMath, ImageSet, ImageryService, ReduceRequest};
use super::{CollectOutcome, Observation, Outcome};
use crate::error::CollectResult;
use crate::geo_core::{DateRange, Region};
use crate::raster::{Scale, TemporalReducer};
use crate::settings::WeatherSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherVariable {
    Temperature,
    Precipitation,
    Humidity,
}

impl WeatherVariable {
    pub const ALL: [WeatherVariable; 3] = [
        WeatherVariable::Temperature,
        WeatherVariable::Precipitation,
        WeatherVariable::Humidity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WeatherVariable::Temperature => "temperature",
            WeatherVariable::Precipitation => "precipitation",
            WeatherVariable::Humidity => "humidity",
        }
    }
}

/// Regional means of gridded reanalysis variables
pub struct WeatherCollector<S> {
    service: S,
    collection: String,
    /// Variable and the band it is read from, in selection order
    bands: Vec<(WeatherVariable, String)>,
    scale: Scale,
    temporal: TemporalReducer,
}

impl<S: ImageryService> WeatherCollector<S> {
    pub fn new(service: S, settings: &WeatherSettings) -> CollectResult<Self> {
        Ok(WeatherCollector {
            service,
            collection: settings.collection.clone(),
            bands: vec![
                (WeatherVariable::Temperature, settings.temperature_band.clone()),
                (WeatherVariable::Precipitation, settings.precipitation_band.clone()),
                (WeatherVariable::Humidity, settings.humidity_band.clone()),
            ],
            scale: Scale::metres(settings.scale_m)?,
            temporal: settings.temporal,
        })
    }

    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Restrict the collection to a subset of variables
    pub fn only(mut self, variables: &[WeatherVariable]) -> Self {
        self.bands.retain(|(variable, _)| variables.contains(variable));
        self
    }

    #[instrument(skip_all, fields(collection = %self.collection, start = %period.start(), end = %period.end()))]
    pub fn collect(&self, region: &Region, period: DateRange) -> CollectResult<CollectOutcome> {
        let band_names: Vec<&str> = self.bands.iter().map(|(_, band)| band.as_str()).collect();
        let images = ImageSet::new(&self.collection, period, region.clone()).select(&band_names);

        let count = self.service.count(&images)?;
        if count == 0 {
            info!("No weather data for the selected area and period");
            return Ok(Outcome::NoData);
        }

        let request = ReduceRequest {
            images,
            band_math: BandMath::Select,
            temporal: self.temporal,
            scale: self.scale,
        };
        let reduced = self.service.reduce_region(&request)?;

        let mut values = BTreeMap::new();
        for (variable, band) in &self.bands {
            match reduced.get(band).copied().flatten() {
                Some(value) => {
                    values.insert(variable.name().to_string(), value);
                }
                None => warn!(band = %band, "No valid pixel for {}", variable.name()),
            }
        }

        if values.is_empty() {
            return Ok(Outcome::NoData);
        }
        info!(images = count, variables = values.len(), "Weather collected");
        Ok(Outcome::Observed(Observation::Variables {
            period,
            values,
            images: count,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::global_variables::CFSR_COLLECTION;
    use crate::collect::imagery::{CatalogImage, LocalCatalog};
    use crate::raster::{Raster, NO_DATA};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn reanalysis(date: &str, temp: f64, prate: f64, rh: f64) -> CatalogImage {
        CatalogImage {
            id: format!("cfsr_{}", date),
            captured: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            raster: Raster::new(-47.96, -15.76, 1000.0, 6, 6)
                .unwrap()
                .with_band("TMP_2m", vec![temp; 36])
                .unwrap()
                .with_band("PRATE_sfc", vec![prate; 36])
                .unwrap()
                .with_band("RH_2m", vec![rh; 36])
                .unwrap(),
        }
    }

    fn catalog() -> LocalCatalog {
        let mut catalog = LocalCatalog::new();
        catalog
            .insert(CFSR_COLLECTION, reanalysis("2024-01-10", 298.0, 0.0, 70.0))
            .unwrap();
        catalog
            .insert(CFSR_COLLECTION, reanalysis("2024-01-20", 300.0, 2.0e-5, 80.0))
            .unwrap();
        catalog
    }

    fn brasilia() -> Region {
        Region::point(-15.7801, -47.9382).unwrap()
    }

    #[test]
    fn test_collect_weather() {
        let collector = WeatherCollector::new(catalog(), &WeatherSettings::default()).unwrap();
        let period = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let obs = collector
            .collect(&brasilia(), period)
            .unwrap()
            .observed()
            .unwrap();

        assert_relative_eq!(obs.get("temperature").unwrap(), 299.0, max_relative = 1e-9);
        assert_relative_eq!(obs.get("precipitation").unwrap(), 1.0e-5, max_relative = 1e-9);
        assert_relative_eq!(obs.get("humidity").unwrap(), 75.0, max_relative = 1e-9);
        assert_eq!(obs.period(), period);
    }

    #[test]
    fn test_no_images_is_no_data() {
        let collector = WeatherCollector::new(catalog(), &WeatherSettings::default()).unwrap();
        let period = DateRange::parse("2023-01-01", "2023-01-31").unwrap();
        assert!(collector.collect(&brasilia(), period).unwrap().is_no_data());
    }

    #[test]
    fn test_only_selected_variables() {
        let collector = WeatherCollector::new(catalog(), &WeatherSettings::default())
            .unwrap()
            .only(&[WeatherVariable::Temperature]);
        let period = DateRange::parse("2024-01-01", "2024-01-15").unwrap();
        let obs = collector
            .collect(&brasilia(), period)
            .unwrap()
            .observed()
            .unwrap();
        assert_eq!(obs.get("temperature"), Some(298.0));
        assert_eq!(obs.get("humidity"), None);
    }

    #[test]
    fn test_all_no_data_pixels() {
        let mut catalog = LocalCatalog::new();
        catalog
            .insert(CFSR_COLLECTION, reanalysis("2024-01-10", NO_DATA, NO_DATA, NO_DATA))
            .unwrap();
        let collector = WeatherCollector::new(catalog, &WeatherSettings::default()).unwrap();
        let period = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        assert!(collector.collect(&brasilia(), period).unwrap().is_no_data());
    }

    #[test]
    fn test_variable_names() {
        let names: Vec<&str> = WeatherVariable::ALL.iter().map(|v| v.name()).collect();
        assert_eq!(names, ["temperature", "precipitation", "humidity"]);
    }
}
