use anyhow::Result;
use agromon::collect::financial::{FinancialCollector, Lookback};
use agromon::collect::Outcome;
use agromon::settings::Settings;

/// Example: one month of coffee futures closing prices
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Example: coffee futures ===\n");

    let settings = Settings::load(None)?;
    let collector = FinancialCollector::from_settings(&settings.financial)?;

    match collector.closing_prices(&settings.financial.ticker, Lookback::OneMonth)? {
        Outcome::Observed(series) => {
            println!("Ticker: {} ({})", series.ticker, series.currency.as_deref().unwrap_or("?"));
            for point in &series.points {
                println!("  - {}: {:.2}", point.date, point.close);
            }
            if let Some(change) = series.change_pct() {
                println!("\nChange over the window: {:+.2}%", change);
            }
        }
        Outcome::NoData => println!("No prices for {}", settings.financial.ticker),
    }

    Ok(())
}
