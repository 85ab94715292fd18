use serde::Serialize;
use std::fmt;

/// Soil moisture below which irrigation is considered, in percent
pub const MOISTURE_THRESHOLD_PCT: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Irrigate,
    NoAction,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Irrigate => f.write_str("irrigate"),
            Decision::NoAction => f.write_str("no_action"),
        }
    }
}

/// Irrigate only when the soil is dry and no rain fell.
///
/// Non-finite inputs never trigger irrigation.
pub fn decide(soil_moisture_pct: f64, precipitation_mm: f64) -> Decision {
    if soil_moisture_pct < MOISTURE_THRESHOLD_PCT && precipitation_mm == 0.0 {
        Decision::Irrigate
    } else {
        Decision::NoAction
    }
}

/// A decision with the depth to apply when irrigating
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IrrigationPlan {
    pub decision: Decision,
    pub soil_moisture_pct: f64,
    pub precipitation_mm: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_mm: Option<f64>,
}

impl IrrigationPlan {
    pub fn recommendation(&self) -> String {
        match self.amount_mm {
            Some(amount) => format!("Irrigate {} mm tomorrow morning", amount),
            None => "No irrigation needed at the moment".to_string(),
        }
    }
}

pub fn plan(soil_moisture_pct: f64, precipitation_mm: f64, recommended_mm: f64) -> IrrigationPlan {
    let decision = decide(soil_moisture_pct, precipitation_mm);
    IrrigationPlan {
        decision,
        soil_moisture_pct,
        precipitation_mm,
        amount_mm: (decision == Decision::Irrigate).then_some(recommended_mm),
    }
}
