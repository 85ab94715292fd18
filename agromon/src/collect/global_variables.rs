//! Default collection identifiers, endpoints and reduction parameters.

/// Landsat 8 Collection 2 Tier 1 surface reflectance
pub const LANDSAT8_COLLECTION: &str = "LANDSAT/LC08/C02/T1_L2";

/// Sentinel-2 harmonized surface reflectance
pub const SENTINEL2_COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Climate Forecast System Reanalysis
pub const CFSR_COLLECTION: &str = "NOAA/CFSR";

/// Default NDVI reduction scale (Landsat native resolution)
pub const DEFAULT_NDVI_SCALE_M: f64 = 30.0;

/// Default reduction scale for the coarse reanalysis grids
pub const DEFAULT_WEATHER_SCALE_M: f64 = 1000.0;

pub const DEFAULT_IMAGERY_URL: &str = "https://earthengine.googleapis.com";

pub const DEFAULT_QUOTE_URL: &str = "https://query1.finance.yahoo.com";

/// Coffee futures
pub const DEFAULT_TICKER: &str = "KC=F";

pub const DEFAULT_CONFIG_FILE: &str = "agromon.toml";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pause before the single retry of a transient failure
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Water depth recommended when irrigation is due
pub const DEFAULT_IRRIGATION_MM: f64 = 10.0;
