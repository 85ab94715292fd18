use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::CollectError;
use crate::geo_core::{deg_to_m_lon, BoundingBox, DEG_TO_M_LAT};

#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("band '{0}' not present in raster")]
    MissingBand(String),

    #[error("band '{band}' has {actual} values, grid needs {expected}")]
    BandLength {
        band: String,
        expected: usize,
        actual: usize,
    },

    #[error("rasters do not share the same grid")]
    GridMismatch,

    #[error("invalid raster geometry: {0}")]
    InvalidGeometry(String),

    #[error("output band '{0}' would overwrite an input band")]
    BandNameClash(String),

    #[error("ground sampling distance must be a positive number of metres, got {0}")]
    InvalidScale(f64),

    #[error("ground sampling distance of {scale} m is too fine for {native} m pixels")]
    ScaleTooFine { scale: f64, native: f64 },
}

impl From<RasterError> for CollectError {
    fn from(err: RasterError) -> Self {
        CollectError::Configuration(err.to_string())
    }
}

/// North-up grid of square pixels in WGS84.
///
/// The origin is the upper-left corner. Pixel size is given in metres on the
/// ground and converted to degrees at the grid's centre latitude. Bands are
/// stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    pub origin_lon: f64,
    pub origin_lat: f64,
    pub pixel_size_m: f64,
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub bands: BTreeMap<String, Vec<f64>>,
}

impl Raster {
    pub fn new(
        origin_lon: f64,
        origin_lat: f64,
        pixel_size_m: f64,
        width: usize,
        height: usize,
    ) -> Result<Self, RasterError> {
        let raster = Raster {
            origin_lon,
            origin_lat,
            pixel_size_m,
            width,
            height,
            bands: BTreeMap::new(),
        };
        raster.check_geometry()?;
        Ok(raster)
    }

    /// Add (or replace) a band
    pub fn with_band(mut self, name: &str, data: Vec<f64>) -> Result<Self, RasterError> {
        if data.len() != self.len() {
            return Err(RasterError::BandLength {
                band: name.to_string(),
                expected: self.len(),
                actual: data.len(),
            });
        }
        self.bands.insert(name.to_string(), data);
        Ok(self)
    }

    /// Check geometry and band lengths, e.g. after deserialization
    pub fn validate(&self) -> Result<(), RasterError> {
        self.check_geometry()?;
        for (name, data) in &self.bands {
            if data.len() != self.len() {
                return Err(RasterError::BandLength {
                    band: name.clone(),
                    expected: self.len(),
                    actual: data.len(),
                });
            }
        }
        Ok(())
    }

    fn check_geometry(&self) -> Result<(), RasterError> {
        if self.width == 0 || self.height == 0 {
            return Err(RasterError::InvalidGeometry(format!(
                "empty grid {}x{}",
                self.width, self.height
            )));
        }
        if !self.pixel_size_m.is_finite() || self.pixel_size_m <= 0.0 {
            return Err(RasterError::InvalidGeometry(format!(
                "pixel size {} m",
                self.pixel_size_m
            )));
        }
        if !(-90.0..=90.0).contains(&self.origin_lat) || !(-180.0..=180.0).contains(&self.origin_lon)
        {
            return Err(RasterError::InvalidGeometry(format!(
                "origin ({}, {}) outside WGS84 bounds",
                self.origin_lon, self.origin_lat
            )));
        }
        Ok(())
    }

    /// Number of pixels per band
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn band(&self, name: &str) -> Result<&[f64], RasterError> {
        self.bands
            .get(name)
            .map(|data| data.as_slice())
            .ok_or_else(|| RasterError::MissingBand(name.to_string()))
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(|name| name.as_str())
    }

    /// Pixel size in degrees, `(lon, lat)`
    pub fn pixel_size_deg(&self) -> (f64, f64) {
        let dlat = self.pixel_size_m / DEG_TO_M_LAT;
        let center_lat = self.origin_lat - dlat * self.height as f64 / 2.0;
        (self.pixel_size_m / deg_to_m_lon(center_lat), dlat)
    }

    /// Footprint of the grid
    pub fn bbox(&self) -> BoundingBox {
        let (dlon, dlat) = self.pixel_size_deg();
        BoundingBox::new(
            self.origin_lon,
            self.origin_lat - dlat * self.height as f64,
            self.origin_lon + dlon * self.width as f64,
            self.origin_lat,
        )
    }

    pub fn same_grid(&self, other: &Raster) -> bool {
        self.origin_lon == other.origin_lon
            && self.origin_lat == other.origin_lat
            && self.pixel_size_m == other.pixel_size_m
            && self.width == other.width
            && self.height == other.height
    }

    /// Same geometry, no bands
    pub fn empty_like(&self) -> Raster {
        Raster {
            origin_lon: self.origin_lon,
            origin_lat: self.origin_lat,
            pixel_size_m: self.pixel_size_m,
            width: self.width,
            height: self.height,
            bands: BTreeMap::new(),
        }
    }
}
