use anyhow::Result;
use agromon::collect::imagery::RemoteImagery;
use agromon::collect::weather::WeatherCollector;
use agromon::collect::Outcome;
use agromon::geo_core::{DateRange, Region};
use agromon::settings::{Credentials, Settings};

/// Example: January 2024 reanalysis means at Brasília
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Example: weather from the remote imagery API ===\n");

    let settings = Settings::load(None)?;
    let credentials = Credentials::resolve(&settings.credentials, |key| std::env::var(key).ok())?;
    let service = RemoteImagery::from_settings(&settings.imagery, &credentials)?;
    let collector = WeatherCollector::new(service, &settings.weather)?;

    let region = Region::point(-15.7801, -47.9382)?;
    let period = DateRange::parse("2024-01-01", "2024-01-31")?;

    match collector.collect(&region, period)? {
        Outcome::Observed(obs) => {
            println!("Weather collected:");
            for key in ["temperature", "precipitation", "humidity"] {
                match obs.get(key) {
                    Some(value) => println!("  - {}: {:.4}", key, value),
                    None => println!("  - {}: no data", key),
                }
            }
        }
        Outcome::NoData => println!("No weather data for the selected area and period."),
    }

    Ok(())
}
