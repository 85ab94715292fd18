//! Command line front end for the agromon collectors.
//!
//! Settings are resolved once at start-up (defaults, then `agromon.toml` or
//! `--config`, then `AGROMON_*` variables, including those from `.env`) and
//! every result is printed to stdout as JSON. Logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use agromon::automation::{plan, Decision, IrrigationController};
use agromon::collect::financial::{FinancialCollector, Lookback};
use agromon::collect::imagery::{ImageryService, LocalCatalog, RemoteImagery};
use agromon::collect::satellite::{SatelliteCollector, Sensor};
use agromon::collect::weather::WeatherCollector;
use agromon::geo_core::{DateRange, Region};
use agromon::prediction::{load_field_records, HistoricalMeanPredictor, YieldPredictor};
use agromon::raster::Scale;
use agromon::settings::{Credentials, Settings};

#[derive(Parser, Debug)]
#[command(name = "agromon")]
#[command(version, about = "Agricultural monitoring: vegetation index, weather, prices and irrigation")]
struct Cli {
    /// Configuration file (default: ./agromon.toml when present)
    #[arg(long, global = true, env = "AGROMON_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mean NDVI of a region over a period
    Ndvi {
        #[command(flatten)]
        query: ImageryQuery,

        /// Sensor preset; also sets the default scale to its native resolution
        #[arg(long, value_enum)]
        sensor: Option<Sensor>,

        /// Split the period into windows of this many days
        #[arg(long)]
        series_days: Option<u32>,
    },

    /// Mean temperature, precipitation and humidity of a region over a period
    Weather {
        #[command(flatten)]
        query: ImageryQuery,
    },

    /// Daily closing prices of a market ticker
    Prices {
        /// Ticker symbol (default from configuration: coffee futures)
        #[arg(long)]
        ticker: Option<String>,

        /// History window: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y
        #[arg(long)]
        lookback: Option<Lookback>,
    },

    /// Decide whether a zone needs irrigation
    Irrigate {
        /// Soil moisture, percent
        #[arg(long)]
        soil_moisture: f64,

        /// Precipitation over the last period, mm
        #[arg(long)]
        precipitation: f64,

        /// Also send the command to this zone when irrigation is due
        #[arg(long)]
        zone: Option<String>,
    },

    /// Send an irrigation command to the actuator
    SendCommand {
        #[arg(long)]
        zone: String,

        /// Depth to apply, mm
        #[arg(long)]
        amount_mm: f64,
    },

    /// Baseline productivity forecast from historical field records (CSV)
    Predict {
        /// Records with a productivity column
        #[arg(long)]
        history: PathBuf,

        /// Fields to forecast
        #[arg(long)]
        fields: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ImageryQuery {
    /// Latitude of the area of interest, decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude of the area of interest, decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Buffer the point into a disc of this radius, metres
    #[arg(long)]
    buffer_m: Option<f64>,

    /// First day, YYYY-MM-DD
    #[arg(long)]
    start: String,

    /// Last day (inclusive), YYYY-MM-DD
    #[arg(long)]
    end: String,

    /// Reduction scale in metres (default from configuration)
    #[arg(long)]
    scale: Option<f64>,

    /// Serve the query from a local JSON catalog
    #[arg(long)]
    catalog: Option<PathBuf>,
}

impl ImageryQuery {
    fn region(&self) -> Result<Region> {
        let region = match self.buffer_m {
            Some(radius) => Region::buffered_point(self.lat, self.lon, radius)?,
            None => Region::point(self.lat, self.lon)?,
        };
        Ok(region)
    }

    fn period(&self) -> Result<DateRange> {
        Ok(DateRange::parse(&self.start, &self.end)?)
    }

    fn scale(&self) -> Result<Option<Scale>> {
        Ok(self.scale.map(Scale::metres).transpose()?)
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log level")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Local catalog when one is given or configured, the remote API otherwise
fn imagery_service(
    settings: &Settings,
    credentials: &Credentials,
    catalog: Option<&Path>,
) -> Result<Box<dyn ImageryService>> {
    match catalog.or(settings.imagery.catalog.as_deref()) {
        Some(path) => {
            info!(path = %path.display(), "Using local imagery catalog");
            Ok(Box::new(LocalCatalog::load(path)?))
        }
        None => {
            info!(url = %settings.imagery.base_url, "Using remote imagery service");
            Ok(Box::new(RemoteImagery::from_settings(
                &settings.imagery,
                credentials,
            )?))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs)?;

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    let credentials = Credentials::resolve(&settings.credentials, |key| std::env::var(key).ok())
        .context("Failed to resolve credentials")?;
    debug!(?settings, ?credentials, "Settings resolved");

    match cli.command {
        Command::Ndvi {
            query,
            sensor,
            series_days,
        } => {
            let mut satellite_settings = settings.satellite.clone();
            if let Some(sensor) = sensor {
                satellite_settings.sensor = sensor;
            }
            let service = imagery_service(&settings, &credentials, query.catalog.as_deref())?;
            let mut collector = SatelliteCollector::new(service, &satellite_settings)?;
            if let Some(scale) = query.scale()? {
                collector = collector.with_scale(scale);
            }

            let region = query.region()?;
            let period = query.period()?;
            match series_days {
                Some(step) => print_json(&collector.collect_series(&region, period, step)?)?,
                None => print_json(&collector.collect(&region, period)?)?,
            }
        }

        Command::Weather { query } => {
            let service = imagery_service(&settings, &credentials, query.catalog.as_deref())?;
            let mut collector = WeatherCollector::new(service, &settings.weather)?;
            if let Some(scale) = query.scale()? {
                collector = collector.with_scale(scale);
            }
            print_json(&collector.collect(&query.region()?, query.period()?)?)?;
        }

        Command::Prices { ticker, lookback } => {
            let collector = FinancialCollector::from_settings(&settings.financial)?;
            let ticker = ticker.unwrap_or_else(|| settings.financial.ticker.clone());
            let lookback = lookback.unwrap_or(settings.financial.lookback);
            print_json(&collector.closing_prices(&ticker, lookback)?)?;
        }

        Command::Irrigate {
            soil_moisture,
            precipitation,
            zone,
        } => {
            let plan = plan(
                soil_moisture,
                precipitation,
                settings.irrigation.recommended_mm,
            );
            info!(decision = %plan.decision, "{}", plan.recommendation());
            print_json(&plan)?;

            if let (Some(zone), Decision::Irrigate, Some(amount)) =
                (zone, plan.decision, plan.amount_mm)
            {
                let controller = IrrigationController::from_settings(&settings.irrigation)?;
                print_json(&controller.send_command(&zone, amount))?;
            }
        }

        Command::SendCommand { zone, amount_mm } => {
            let controller = IrrigationController::from_settings(&settings.irrigation)?;
            print_json(&controller.send_command(&zone, amount_mm))?;
        }

        Command::Predict { history, fields } => {
            let history = load_field_records(&history)?;
            let fields = load_field_records(&fields)?;
            let predictor = HistoricalMeanPredictor::fit(&history)?;
            print_json(&predictor.predict(&fields)?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const NDVI_ARGS: [&str; 10] = [
        "agromon", "ndvi", "--lat", "-15.78", "--lon", "-47.94", "--start", "2024-01-01", "--end",
        "2024-01-31",
    ];

    fn parse_with(extra: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(NDVI_ARGS.iter().chain(extra))
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sensor_is_parsed_by_clap() {
        let cli = parse_with(&["--sensor", "sentinel2"]).unwrap();
        match cli.command {
            Command::Ndvi { sensor, .. } => assert_eq!(sensor, Some(Sensor::Sentinel2)),
            other => panic!("unexpected command: {:?}", other),
        }
        let err = parse_with(&["--sensor", "modis"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
