//! Unit listing and detail.

use std::sync::Arc;

use tabled::Tabled;

use sabiana_core::{Coordinator, DeviceIdentity, DeviceSnapshot};

use crate::cli::{GlobalOpts, UnitsArgs};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(super) struct UnitRow {
    #[tabled(rename = "Unit")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "Fan")]
    fan: String,
    #[tabled(rename = "Temp")]
    temp: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Alarms")]
    alarms: String,
    #[tabled(rename = "State")]
    state: String,
}

impl UnitRow {
    pub(super) fn new(u: &DeviceSnapshot, session: &Session, color: bool) -> Self {
        Self {
            id: u.identity().to_string(),
            name: u.display_name().to_owned(),
            power: output::power_label(u.vent.is_on(), color),
            mode: u.vent.hvac_mode().to_string(),
            fan: util::fan_text(u, session),
            temp: util::fmt_temp(util::current_temperature(u, session)),
            target: util::target_text(u, session),
            alarms: util::alarms_text(u),
            state: output::pending_marker(u.pending, color),
        }
    }
}

fn detail(u: &DeviceSnapshot, session: &Session) -> String {
    let vent = &u.vent;
    let (min, max) = vent.setpoint_bounds();
    let mut lines = vec![
        format!("Unit:        {}", u.identity()),
        format!("Name:        {}", u.display_name()),
        format!("Group:       {}", u.group_name.as_deref().unwrap_or("-")),
        format!("Type:        {}", u.unit_type.as_deref().unwrap_or("-")),
        format!("Controller:  {}", u.controller_type.as_deref().unwrap_or("-")),
        format!("Power:       {}", if vent.is_on() { "on" } else { "off" }),
        format!("Mode:        {}", vent.mode.as_deref().unwrap_or("-")),
        format!("Fan:         {}", util::fan_text(u, session)),
        format!("Air (T1):    {}", util::fmt_temp(vent.temperatures.t1)),
        format!("T2:          {}", util::fmt_temp(vent.temperatures.t2)),
        format!("Water (T3):  {}", util::fmt_temp(vent.temperatures.t3)),
        format!("Target:      {}", util::target_text(u, session)),
        format!(
            "Range:       {} .. {}",
            util::fmt_temp(min),
            util::fmt_temp(max)
        ),
        format!("Alarms:      {}", util::alarms_text(u)),
        format!("Last update: {}", util::last_update_text(u)),
    ];
    if vent.locks.all_features {
        lines.push("Locks:       all features".into());
    }
    if u.pending {
        lines.push("State:       pending confirmation".into());
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    coordinator: &Coordinator,
    session: &Session,
    args: UnitsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    coordinator.refresh().await?;
    let color = output::should_color(&global.color);

    let out = match args.unit {
        Some(raw) => {
            let unit = find_unit(coordinator, &raw)?;
            output::render_single(
                &global.output,
                &unit,
                |u| detail(u, session),
                |u| u.identity().to_string(),
            )?
        }
        None => output::render_list(
            &global.output,
            &coordinator.units(),
            |u| UnitRow::new(u, session, color),
            |u| u.identity().to_string(),
        )?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Look a unit up by its `group:address` identifier.
pub(super) fn find_unit(coordinator: &Coordinator, raw: &str) -> Result<Arc<DeviceSnapshot>, CliError> {
    let identity: DeviceIdentity = raw.parse()?;
    coordinator
        .unit(&identity)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "unit".into(),
            identifier: identity.to_string(),
            list_command: "units".into(),
        })
}
