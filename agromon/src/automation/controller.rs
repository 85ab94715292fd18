use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, instrument};
use url::Url;

use crate::collect::http::{build_client, classify_error, classify_status};
use crate::error::{CollectError, CollectResult};
use crate::settings::IrrigationSettings;

const SERVICE: &str = "actuator";

/// Payload delivered to the irrigation system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrrigationCommand {
    pub zone_id: String,
    pub amount_mm: f64,
}

/// Delivery of a command to the field hardware
pub trait ActuatorTransport {
    /// Deliver `command`, returning a short confirmation
    fn deliver(&self, command: &IrrigationCommand) -> CollectResult<String>;
}

impl<T: ActuatorTransport + ?Sized> ActuatorTransport for Box<T> {
    fn deliver(&self, command: &IrrigationCommand) -> CollectResult<String> {
        (**self).deliver(command)
    }
}

impl<T: ActuatorTransport + ?Sized> ActuatorTransport for &T {
    fn deliver(&self, command: &IrrigationCommand) -> CollectResult<String> {
        (**self).deliver(command)
    }
}

/// JSON POST of the command to an HTTP endpoint, no retry
pub struct HttpActuator {
    client: Client,
    url: Url,
}

impl HttpActuator {
    pub fn new(url: &str, timeout: Duration) -> CollectResult<Self> {
        let url = Url::parse(url)
            .map_err(|e| CollectError::config(format!("invalid actuator URL '{}': {}", url, e)))?;
        Ok(HttpActuator {
            client: build_client(timeout)?,
            url,
        })
    }
}

impl ActuatorTransport for HttpActuator {
    fn deliver(&self, command: &IrrigationCommand) -> CollectResult<String> {
        let response = self
            .client
            .post(self.url.clone())
            .json(command)
            .send()
            .map_err(|e| CollectError::remote(SERVICE, classify_error(&e), e.to_string()))?;
        let status = response.status();
        if let Some(kind) = classify_status(status) {
            return Err(CollectError::remote(SERVICE, kind, format!("HTTP {}", status)));
        }
        Ok("Command sent".to_string())
    }
}

/// Logs the command and reports success without contacting any device
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunActuator;

impl ActuatorTransport for DryRunActuator {
    fn deliver(&self, command: &IrrigationCommand) -> CollectResult<String> {
        info!(
            zone_id = %command.zone_id,
            amount_mm = command.amount_mm,
            "Dry run: irrigation command not sent to hardware"
        );
        Ok("Command sent (dry run)".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Success,
    Error,
}

/// What the caller gets back from [`IrrigationController::send_command`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: String,
}

impl CommandResult {
    fn success(message: impl Into<String>) -> Self {
        CommandResult {
            status: CommandStatus::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        CommandResult {
            status: CommandStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Success
    }
}

pub struct IrrigationController<T> {
    transport: T,
}

impl<T: ActuatorTransport> IrrigationController<T> {
    pub fn new(transport: T) -> Self {
        IrrigationController { transport }
    }

    /// Send an irrigation command. Every failure, including an invalid
    /// command, is reported in the returned status.
    #[instrument(skip(self))]
    pub fn send_command(&self, zone_id: &str, amount_mm: f64) -> CommandResult {
        if zone_id.trim().is_empty() {
            return CommandResult::error("zone id is empty");
        }
        if !amount_mm.is_finite() || amount_mm <= 0.0 {
            return CommandResult::error(format!("invalid irrigation amount: {} mm", amount_mm));
        }

        let command = IrrigationCommand {
            zone_id: zone_id.to_string(),
            amount_mm,
        };
        match self.transport.deliver(&command) {
            Ok(message) => {
                info!("Irrigation command sent to zone {}: {} mm", zone_id, amount_mm);
                CommandResult::success(message)
            }
            Err(e) => {
                error!("Failed to send irrigation command: {}", e);
                CommandResult::error(e.to_string())
            }
        }
    }
}

impl IrrigationController<Box<dyn ActuatorTransport>> {
    /// HTTP transport when an actuator URL is configured, dry run otherwise
    pub fn from_settings(settings: &IrrigationSettings) -> CollectResult<Self> {
        let transport: Box<dyn ActuatorTransport> = match &settings.actuator_url {
            Some(url) => Box::new(HttpActuator::new(
                url,
                Duration::from_secs(settings.timeout_secs),
            )?),
            None => Box::new(DryRunActuator),
        };
        Ok(IrrigationController::new(transport))
    }
}
