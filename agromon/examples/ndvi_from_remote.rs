use anyhow::Result;
use agromon::collect::imagery::RemoteImagery;
use agromon::collect::satellite::SatelliteCollector;
use agromon::collect::Outcome;
use agromon::geo_core::{DateRange, Region};
use agromon::settings::{Credentials, Settings};

/// Example: mean NDVI around Brasília from the remote imagery API
///
/// Needs AGROMON_ACCESS_TOKEN and a project (AGROMON_PROJECT or EE_CREDENTIALS).
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Example: NDVI from the remote imagery API ===\n");

    let settings = Settings::load(None)?;
    let credentials = Credentials::resolve(&settings.credentials, |key| std::env::var(key).ok())?;
    let service = RemoteImagery::from_settings(&settings.imagery, &credentials)?;
    let collector = SatelliteCollector::new(service, &settings.satellite)?;

    // 1 km disc around the point
    let region = Region::buffered_point(-15.7801, -47.9382, 1000.0)?;
    let period = DateRange::parse("2024-01-01", "2024-03-31")?;

    println!("Collection: {}", collector.collection());
    println!("Scale: {} m", collector.scale().as_metres());
    println!("Period: {} to {}\n", period.start(), period.end());

    match collector.collect(&region, period)? {
        Outcome::Observed(obs) => println!("{}", serde_json::to_string_pretty(&obs)?),
        Outcome::NoData => println!("No images for the selected area and period."),
    }

    Ok(())
}
