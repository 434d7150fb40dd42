//! Shared formatting helpers for vent units.

use sabiana_core::DeviceSnapshot;

use crate::config::{Session, SetpointStrategy, TemperatureSource};

/// `21.5°C`, or `-` when unknown.
pub fn fmt_temp(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.1}°C"))
}

/// Current temperature from the probe the profile selects.
pub fn current_temperature(unit: &DeviceSnapshot, session: &Session) -> Option<f64> {
    let temps = &unit.vent.temperatures;
    match session.temperature_source {
        TemperatureSource::T1 => temps.t1,
        TemperatureSource::T3 => temps.t3,
    }
}

/// Target temperature: the one for the current mode, or `heat/cool` when
/// the profile shows both.
pub fn target_text(unit: &DeviceSnapshot, session: &Session) -> String {
    match session.setpoint_strategy {
        SetpointStrategy::Single => fmt_temp(unit.vent.target_temperature()),
        SetpointStrategy::Dual => format!(
            "{} / {}",
            fmt_temp(unit.vent.setpoints.heating),
            fmt_temp(unit.vent.setpoints.cooling)
        ),
    }
}

/// Fan speed as the profile labels it.
pub fn fan_text(unit: &DeviceSnapshot, session: &Session) -> String {
    unit.vent
        .fan
        .as_deref()
        .map_or_else(|| "-".into(), |f| session.fan_map.label(f))
}

pub fn alarms_text(unit: &DeviceSnapshot) -> String {
    if unit.vent.alarms.active.is_empty() {
        "-".into()
    } else {
        unit.vent.alarms.active.join(", ")
    }
}

/// `2026-10-16 08:30:00 UTC`, or `-`.
pub fn last_update_text(unit: &DeviceSnapshot) -> String {
    unit.last_update_at()
        .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
