// ── Wire → domain conversion ──
//
// Turns the nested `Group { units }` payload of a poll into flat
// `DeviceSnapshot` candidates. Only vent units survive; sensors and other
// unit types are dropped here so nothing downstream has to filter again.

use serde_json::Value;

use sabiana_api::{Group, Unit, VentUnit};

use crate::model::{Alarms, DeviceSnapshot, Locks, Setpoints, Temperatures, VentState};

const VENT_UNIT_TYPES: &[&str] = &["vent", "ventunit"];

/// `true` if `unitType` names a vent unit, ignoring case.
pub fn is_vent_unit(unit_type: Option<&str>) -> bool {
    unit_type.is_some_and(|t| VENT_UNIT_TYPES.iter().any(|v| t.eq_ignore_ascii_case(v)))
}

/// Flatten groups into vent-unit snapshots, in server order. None are
/// pending yet.
pub fn flatten_groups(groups: &[Group]) -> Vec<DeviceSnapshot> {
    groups
        .iter()
        .flat_map(|group| {
            group
                .units
                .iter()
                .filter(|unit| is_vent_unit(unit.unit_type.as_deref()))
                .map(move |unit| device_snapshot(group, unit))
        })
        .collect()
}

fn device_snapshot(group: &Group, unit: &Unit) -> DeviceSnapshot {
    DeviceSnapshot {
        group_id: group.group_id.clone(),
        group_name: group.group_name.clone(),
        name: unit.name.clone(),
        address: unit.address.clone(),
        last_update: unit.last_update,
        controller_type: unit.controller_type.clone(),
        unit_type: unit.unit_type.clone(),
        vent: unit.vent_unit.clone().map(VentState::from).unwrap_or_default(),
        pending: false,
    }
}

impl From<VentUnit> for VentState {
    fn from(v: VentUnit) -> Self {
        let active = v.active_alarms.iter().map(alarm_label).collect::<Vec<_>>();
        let with_active_alarms = v.with_active_alarms.unwrap_or(!active.is_empty());

        Self {
            on: v.on,
            mode: v.mode,
            fan: v.fan,
            temperatures: Temperatures {
                t1: v.t1,
                t2: v.t2,
                t3: v.t3,
            },
            setpoints: Setpoints {
                set_point: v.set_point,
                heating: v.set_point_heating,
                cooling: v.set_point_cooling,
                auto_mode: v.set_point_auto_mode,
                auto_mode_range: v.set_point_auto_mode_range,
                heating_min: v.set_point_heating_min,
                heating_max: v.set_point_heating_max,
                cooling_min: v.set_point_cooling_min,
                cooling_max: v.set_point_cooling_max,
            },
            auto_mode_available: v.auto_mode_available,
            request_thermo: v.request_thermo,
            alarms: Alarms {
                active,
                with_active_alarms,
            },
            locks: Locks {
                all_features: v.lock_all_features.unwrap_or(false),
                on_off: v.lock_on_off.unwrap_or(false),
                mode: v.lock_mode.unwrap_or(false),
                set: v.lock_set.unwrap_or(false),
                fan: v.lock_fan.unwrap_or(false),
            },
            slave: v.slave,
            flap: v.flap,
            extra: v.extra,
        }
    }
}

/// Alarms arrive as bare strings or small objects; keep something printable.
fn alarm_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["code", "name", "description"]
            .iter()
            .find_map(|k| map.get(*k))
            .map_or_else(|| value.to_string(), scalar_text),
        other => other.to_string(),
    }
}

fn scalar_text(value: &Value) -> String {
    value.as_str().map_or_else(|| value.to_string(), str::to_owned)
}
