//! Irrigation decisions and the actuator that carries them out.

pub mod controller;
pub mod irrigation;

pub use controller::{
    ActuatorTransport, CommandResult, CommandStatus, DryRunActuator, HttpActuator,
    IrrigationCommand, IrrigationController,
};
pub use irrigation::{decide, plan, Decision, IrrigationPlan, MOISTURE_THRESHOLD_PCT};
