use anyhow::Result;
use agromon::automation::{plan, DryRunActuator, IrrigationController};

/// Example: irrigation decisions for a few sensor readings, sent to a dry-run actuator
fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("=== Example: irrigation plan ===\n");

    let controller = IrrigationController::new(DryRunActuator);
    let readings = [("zone_1", 22.0, 0.0), ("zone_2", 35.0, 0.0), ("zone_3", 18.0, 4.2)];

    for (zone, moisture, rain) in readings {
        let plan = plan(moisture, rain, 10.0);
        println!("{}: moisture {}%, rain {} mm -> {}", zone, moisture, rain, plan.recommendation());
        if let Some(amount) = plan.amount_mm {
            let result = controller.send_command(zone, amount);
            println!("  - {}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}
