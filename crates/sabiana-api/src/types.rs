// Wire types for the Sabiana Cloud REST API.
//
// Field names follow the server's camelCase JSON. The server is loose
// about scalar types (ids arrive as numbers or strings, flags as bools or
// 0/1), so the `de` helpers below normalize them. Anything not modeled
// explicitly lands in `extra` and round-trips untouched.
//
// One odd unit must not sink a whole listing: units that fail to decode
// are logged and skipped, and a malformed `ventUnit` decodes as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Groups & units ───────────────────────────────────────────────────

/// One entry of `GET /api/v1/vent`: a server-side collection of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default, deserialize_with = "de::opaque_id")]
    pub group_id: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub group_name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_units")]
    pub units: Vec<Unit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A unit record, as nested in a [`Group`] or returned by
/// `GET /api/v1/unit/{address}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(default, deserialize_with = "de::opaque_id")]
    pub address: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub unit_type: Option<String>,
    /// Epoch milliseconds of the last authoritative state change.
    #[serde(default, deserialize_with = "de::epoch_millis")]
    pub last_update: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub controller_type: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_vent_unit")]
    pub vent_unit: Option<VentUnit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Live state of a ventilation controller (`ventUnit`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VentUnit {
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub on: Option<bool>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub fan: Option<String>,

    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub t1: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub t2: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub t3: Option<f64>,

    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_heating: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_cooling: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_auto_mode: Option<f64>,
    #[serde(default)]
    pub set_point_auto_mode_range: Option<Value>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_heating_min: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_heating_max: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_cooling_min: Option<f64>,
    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub set_point_cooling_max: Option<f64>,

    /// Spelled `autoModeAvalible` by the server.
    #[serde(
        default,
        rename = "autoModeAvalible",
        deserialize_with = "de::flexible_bool"
    )]
    pub auto_mode_available: Option<bool>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub request_thermo: Option<bool>,

    #[serde(default, deserialize_with = "de::lenient_list")]
    pub active_alarms: Vec<Value>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub with_active_alarms: Option<bool>,

    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub lock_all_features: Option<bool>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub lock_on_off: Option<bool>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub lock_mode: Option<bool>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub lock_set: Option<bool>,
    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub lock_fan: Option<bool>,

    #[serde(default)]
    pub slave: Option<Value>,
    #[serde(default)]
    pub flap: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Commands ─────────────────────────────────────────────────────────

/// Body of `POST /api/v1/cmd/vent/{address}`.
///
/// The endpoint always takes the full desired state, never a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VentCommand {
    pub on: bool,
    pub mode: String,
    pub fan: String,
    pub set_point: f64,
}

// ── Lenient scalar decoding ──────────────────────────────────────────

mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tracing::warn;

    use super::{Unit, VentUnit};

    /// Strings as-is, numbers and bools rendered, anything else absent.
    pub(super) fn lenient_string<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            v @ (Value::Number(_) | Value::Bool(_)) => Some(v.to_string()),
            _ => None,
        })
    }

    /// A lone value counts as a one-element list; null as empty.
    pub(super) fn lenient_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Value>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    pub(super) fn lenient_units<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Unit>, D::Error> {
        let items = match Value::deserialize(d)? {
            Value::Array(items) => items,
            Value::Null => return Ok(Vec::new()),
            other => {
                warn!(found = %kind(&other), "units is not a list, ignoring");
                return Ok(Vec::new());
            }
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match Unit::deserialize(item) {
                Ok(unit) => Some(unit),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable unit");
                    None
                }
            })
            .collect())
    }

    pub(super) fn lenient_vent_unit<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<VentUnit>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            v @ Value::Object(_) => match VentUnit::deserialize(v) {
                Ok(vent) => Ok(Some(vent)),
                Err(e) => {
                    warn!(error = %e, "ignoring undecodable ventUnit");
                    Ok(None)
                }
            },
            other => {
                warn!(found = %kind(&other), "ventUnit is not an object, ignoring");
                Ok(None)
            }
        }
    }

    fn kind(v: &Value) -> &'static str {
        match v {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Ids are opaque: keep strings as-is, render numbers in decimal.
    pub(super) fn opaque_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub(super) fn epoch_millis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(truncate_millis)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(truncate_millis),
            _ => None,
        })
    }

    pub(super) fn flexible_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub(super) fn flexible_bool<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" => Some(true),
                "false" | "0" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    fn truncate_millis(v: f64) -> i64 {
        v.trunc() as i64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_tolerates_numeric_ids_and_null_units() {
        let group: Group = serde_json::from_value(json!({
            "groupId": 42,
            "groupName": "Ground floor",
            "units": null
        }))
        .unwrap();

        assert_eq!(group.group_id, "42");
        assert!(group.units.is_empty());
    }

    #[test]
    fn unit_keeps_unknown_fields() {
        let unit: Unit = serde_json::from_value(json!({
            "address": "A1",
            "unitType": "vent",
            "lastUpdate": "1700000000000",
            "firmware": "1.2.3",
            "ventUnit": { "on": 1, "t1": "21.5", "autoModeAvalible": true, "zone": 4 }
        }))
        .unwrap();

        assert_eq!(unit.last_update, Some(1_700_000_000_000));
        assert_eq!(unit.extra.get("firmware"), Some(&json!("1.2.3")));

        let vent = unit.vent_unit.unwrap();
        assert_eq!(vent.on, Some(true));
        assert_eq!(vent.t1, Some(21.5));
        assert_eq!(vent.auto_mode_available, Some(true));
        assert_eq!(vent.extra.get("zone"), Some(&json!(4)));
    }

    #[test]
    fn malformed_units_are_skipped_not_fatal() {
        let group: Group = serde_json::from_value(json!({
            "groupId": "g1",
            "groupName": 7,
            "units": [
                "not-a-unit",
                {
                    "address": "5E45",
                    "name": 7,
                    "unitType": 3,
                    "controllerType": false,
                    "ventUnit": []
                },
                {
                    "address": "0A1B",
                    "unitType": "vent",
                    "ventUnit": { "on": true, "mode": 2, "fan": "V1", "activeAlarms": "E1" }
                }
            ]
        }))
        .unwrap();

        assert_eq!(group.group_name.as_deref(), Some("7"));
        assert_eq!(group.units.len(), 2);

        let sensor = &group.units[0];
        assert_eq!(sensor.address, "5E45");
        assert_eq!(sensor.name.as_deref(), Some("7"));
        assert_eq!(sensor.unit_type.as_deref(), Some("3"));
        assert_eq!(sensor.controller_type.as_deref(), Some("false"));
        assert!(sensor.vent_unit.is_none());

        let vent = group.units[1].vent_unit.as_ref().unwrap();
        assert_eq!(vent.mode.as_deref(), Some("2"));
        assert_eq!(vent.fan.as_deref(), Some("V1"));
        assert_eq!(vent.active_alarms, vec![json!("E1")]);
    }

    #[test]
    fn non_list_units_decode_as_empty() {
        let group: Group = serde_json::from_value(json!({
            "groupId": "g1",
            "units": { "address": "0A1B" }
        }))
        .unwrap();
        assert!(group.units.is_empty());
    }

    #[test]
    fn command_serializes_camel_case() {
        let cmd = VentCommand {
            on: true,
            mode: "heating".into(),
            fan: "V2".into(),
            set_point: 21.0,
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({ "on": true, "mode": "heating", "fan": "V2", "setPoint": 21.0 })
        );
    }
}
