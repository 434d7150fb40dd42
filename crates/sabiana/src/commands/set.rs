//! `set`: change mode, fan speed or target temperature of one unit.

use tabled::Tabled;

use sabiana_core::{Command as CoreCommand, CommandResult, Coordinator, DeviceIdentity};

use crate::cli::{GlobalOpts, SetArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct SentRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Setpoint")]
    set_point: String,
}

impl SentRow {
    fn new(r: &CommandResult, session: &Session) -> Self {
        Self {
            unit: r.identity.to_string(),
            power: if r.command.on { "on" } else { "off" }.into(),
            mode: r.command.mode.clone(),
            fan: session.fan_map.label(&r.command.fan),
            set_point: format!("{:.1}°C", r.command.set_point),
        }
    }
}

/// Core commands for `args`, in the order they are sent. Mode goes first
/// so the temperature is clamped against the new mode's bounds.
fn build_commands(args: &SetArgs, session: &Session) -> Result<Vec<CoreCommand>, CliError> {
    let identity = DeviceIdentity::new(args.group.clone(), args.address.clone());
    let mut commands = Vec::new();

    if let Some(mode) = args.mode {
        commands.push(CoreCommand::SetHvacMode {
            identity: identity.clone(),
            mode: mode.into(),
        });
    }
    if let Some(ref label) = args.fan {
        let fan = session
            .fan_map
            .try_api_value(label)
            .ok_or_else(|| CliError::Validation {
                field: "fan".into(),
                reason: format!(
                    "unknown fan speed '{label}', expected one of: {}",
                    session.fan_map.labels().join(", ")
                ),
            })?;
        commands.push(CoreCommand::SetFanMode {
            identity: identity.clone(),
            fan,
        });
    }
    if let Some(temperature) = args.temperature {
        commands.push(CoreCommand::SetTemperature {
            identity,
            temperature,
        });
    }
    Ok(commands)
}

pub async fn handle(
    coordinator: &Coordinator,
    session: &Session,
    args: SetArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let commands = build_commands(&args, session)?;

    // Commands are resolved against the unit's current state
    coordinator.refresh().await?;

    let mut sent = Vec::with_capacity(commands.len());
    for cmd in commands {
        sent.push(coordinator.execute(cmd).await?);
    }

    let out = output::render_list(
        &global.output,
        &sent,
        |r| SentRow::new(r, session),
        |r| r.identity.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
