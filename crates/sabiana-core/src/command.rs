// ── Command API ──
//
// Every write goes through the `Command` enum. The cloud only accepts the
// full desired state (`on`, `mode`, `fan`, `setPoint`), so each command is
// resolved against the unit's current state into a complete
// `VentCommand` plus the `VentPatch` to show until the change is confirmed.

use serde::Serialize;

use sabiana_api::VentCommand;

use crate::error::CoreError;
use crate::model::fan::FAN_AUTO;
use crate::model::{DeviceIdentity, HvacMode, VentMode, VentPatch, VentState};

/// All write operations against a vent unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Switch mode. [`HvacMode::Off`] turns the unit off and keeps its mode.
    SetHvacMode {
        identity: DeviceIdentity,
        mode: HvacMode,
    },
    /// Set fan speed, as the cloud value (`auto`, `V1`, ...).
    SetFanMode {
        identity: DeviceIdentity,
        fan: String,
    },
    /// Set the target temperature for the current mode. Clamped into the
    /// mode's bounds.
    SetTemperature {
        identity: DeviceIdentity,
        temperature: f64,
    },
    /// Send a full state as-is.
    Raw {
        identity: DeviceIdentity,
        command: VentCommand,
    },
}

impl Command {
    pub fn identity(&self) -> &DeviceIdentity {
        match self {
            Self::SetHvacMode { identity, .. }
            | Self::SetFanMode { identity, .. }
            | Self::SetTemperature { identity, .. }
            | Self::Raw { identity, .. } => identity,
        }
    }
}

/// What a command resolved to against a unit's state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Intent {
    pub command: VentCommand,
    pub patch: VentPatch,
}

/// Result of a dispatched command.
///
/// The cloud accepted it; the unit has not necessarily applied it yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub identity: DeviceIdentity,
    pub command: VentCommand,
    /// Stamp of the pending write recorded for this command.
    pub since_millis: i64,
}

/// Merge `cmd` onto `state` into the full command to send.
pub(crate) fn resolve(cmd: &Command, state: &VentState) -> Result<Intent, CoreError> {
    let current_mode = || state.mode.clone().unwrap_or_else(|| VentMode::Auto.to_string());
    let current_fan = || state.fan.clone().unwrap_or_else(|| FAN_AUTO.to_owned());

    match cmd {
        Command::SetHvacMode { mode, .. } => {
            let command = VentCommand {
                on: *mode != HvacMode::Off,
                mode: mode.vent_mode().map_or_else(current_mode, |m| m.to_string()),
                fan: current_fan(),
                set_point: state.effective_setpoint(),
            };
            let patch = VentPatch::from(&command);
            Ok(Intent { command, patch })
        }
        Command::SetFanMode { fan, .. } => {
            if fan.trim().is_empty() {
                return Err(CoreError::Validation {
                    message: "fan mode must not be empty".into(),
                });
            }
            let command = VentCommand {
                on: state.on.unwrap_or(true),
                mode: current_mode(),
                fan: fan.clone(),
                set_point: state.effective_setpoint(),
            };
            let patch = VentPatch::from(&command);
            Ok(Intent { command, patch })
        }
        Command::SetTemperature { temperature, .. } => {
            if !temperature.is_finite() {
                return Err(CoreError::Validation {
                    message: format!("temperature must be a finite number, got {temperature}"),
                });
            }
            let target = state.clamp_setpoint(*temperature);
            let command = VentCommand {
                on: state.on.unwrap_or(true),
                mode: current_mode(),
                fan: current_fan(),
                set_point: target,
            };
            let mut patch = VentPatch::from(&command);
            match state.vent_mode() {
                Some(VentMode::Heating) => patch.set_point_heating = Some(target),
                Some(VentMode::Cooling) => patch.set_point_cooling = Some(target),
                _ => {}
            }
            Ok(Intent { command, patch })
        }
        Command::Raw { command, .. } => {
            if !command.set_point.is_finite() {
                return Err(CoreError::Validation {
                    message: "setPoint must be a finite number".into(),
                });
            }
            Ok(Intent {
                command: command.clone(),
                patch: VentPatch::from(command),
            })
        }
    }
}
