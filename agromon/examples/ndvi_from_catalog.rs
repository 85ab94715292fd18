use anyhow::Result;
use chrono::NaiveDate;
use agromon::collect::imagery::{CatalogImage, LocalCatalog};
use agromon::collect::satellite::{SatelliteCollector, Sensor};
use agromon::collect::Outcome;
use agromon::geo_core::{DateRange, Region};
use agromon::raster::{Raster, Scale};
use agromon::settings::SatelliteSettings;

/// Example: NDVI of a coffee plot from an in-memory catalog, at several scales
fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Example: NDVI from a local catalog ===\n");

    // 16 x 16 Landsat-like grid at 30 m: canopy to the east, bare soil to the west
    let (width, height) = (16, 16);
    let mut nir = Vec::with_capacity(width * height);
    let mut red = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let canopy = col >= width / 2;
            nir.push(if canopy { 0.42 } else { 0.24 });
            red.push(if canopy { 0.06 } else { 0.18 });
        }
    }
    let raster = Raster::new(-47.95, -15.77, 30.0, width, height)?
        .with_band("SR_B5", nir)?
        .with_band("SR_B4", red)?;

    let mut catalog = LocalCatalog::new();
    for (id, date) in [("LC08_A", "2024-01-09"), ("LC08_B", "2024-01-25")] {
        catalog.insert(
            Sensor::Landsat8.collection(),
            CatalogImage {
                id: id.to_string(),
                captured: NaiveDate::parse_from_str(date, "%Y-%m-%d")?,
                raster: raster.clone(),
            },
        )?;
    }

    // Point in the first canopy column
    let (dlon, dlat) = raster.pixel_size_deg();
    let region = Region::point(-15.77 - 8.5 * dlat, -47.95 + 8.5 * dlon)?;
    let period = DateRange::parse("2024-01-01", "2024-01-31")?;

    println!("Region: point {:?}", region.bbox().center());
    println!("Period: {} to {}\n", period.start(), period.end());

    for metres in [30.0, 90.0, 240.0, 480.0] {
        let collector = SatelliteCollector::new(&catalog, &SatelliteSettings::default())?
            .with_scale(Scale::metres(metres)?);
        match collector.collect(&region, period)? {
            Outcome::Observed(obs) => {
                println!("  - scale {:>5} m: NDVI = {:.4}", metres, obs.get("NDVI").unwrap_or(f64::NAN))
            }
            Outcome::NoData => println!("  - scale {:>5} m: no data", metres),
        }
    }

    println!("\n✅ Done!");
    Ok(())
}
