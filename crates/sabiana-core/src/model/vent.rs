// ── Vent unit state ──
//
// `VentState` is the authoritative `ventUnit` record in domain form.
// `VentPatch` is the partial state a command wants to reach; overlaying
// it onto a `VentState` yields what presentation should show while the
// command is unconfirmed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

/// Setpoint used when neither the current mode nor the unit reports one.
pub const FALLBACK_SETPOINT: f64 = 22.0;

// ── Modes ────────────────────────────────────────────────────────────

/// Operating mode as the cloud names it (`mode` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum VentMode {
    Heating,
    Cooling,
    Auto,
    Ventilate,
}

/// Climate mode as a home-automation host exposes it.
///
/// `Off` is not a cloud mode: it maps to `on = false` with the mode left
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum HvacMode {
    Off,
    Heat,
    Cool,
    Auto,
    FanOnly,
}

impl HvacMode {
    /// The cloud mode this maps to; `None` for [`Off`](Self::Off).
    pub fn vent_mode(self) -> Option<VentMode> {
        match self {
            Self::Off => None,
            Self::Heat => Some(VentMode::Heating),
            Self::Cool => Some(VentMode::Cooling),
            Self::Auto => Some(VentMode::Auto),
            Self::FanOnly => Some(VentMode::Ventilate),
        }
    }
}

impl From<VentMode> for HvacMode {
    fn from(mode: VentMode) -> Self {
        match mode {
            VentMode::Heating => Self::Heat,
            VentMode::Cooling => Self::Cool,
            VentMode::Auto => Self::Auto,
            VentMode::Ventilate => Self::FanOnly,
        }
    }
}

// ── State ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    /// Air temperature.
    pub t1: Option<f64>,
    pub t2: Option<f64>,
    /// Water temperature.
    pub t3: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setpoints {
    pub set_point: Option<f64>,
    pub heating: Option<f64>,
    pub cooling: Option<f64>,
    pub auto_mode: Option<f64>,
    pub auto_mode_range: Option<Value>,
    pub heating_min: Option<f64>,
    pub heating_max: Option<f64>,
    pub cooling_min: Option<f64>,
    pub cooling_max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarms {
    pub active: Vec<String>,
    pub with_active_alarms: bool,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locks {
    pub all_features: bool,
    pub on_off: bool,
    pub mode: bool,
    pub set: bool,
    pub fan: bool,
}

/// Full state of one vent unit.
///
/// `mode` and `fan` stay raw strings: the cloud owns their vocabulary and
/// an unrecognized value must still be shown verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VentState {
    pub on: Option<bool>,
    pub mode: Option<String>,
    pub fan: Option<String>,
    pub temperatures: Temperatures,
    pub setpoints: Setpoints,
    pub auto_mode_available: Option<bool>,
    pub request_thermo: Option<bool>,
    pub alarms: Alarms,
    pub locks: Locks,
    pub slave: Option<Value>,
    pub flap: Option<Value>,
    /// Fields the cloud sent that are not modeled above.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl VentState {
    /// A new state with every `Some` field of `patch` applied.
    pub fn overlay(&self, patch: &VentPatch) -> Self {
        let mut next = self.clone();
        if let Some(on) = patch.on {
            next.on = Some(on);
        }
        if let Some(ref mode) = patch.mode {
            next.mode = Some(mode.clone());
        }
        if let Some(ref fan) = patch.fan {
            next.fan = Some(fan.clone());
        }
        if let Some(sp) = patch.set_point {
            next.setpoints.set_point = Some(sp);
        }
        if let Some(sp) = patch.set_point_heating {
            next.setpoints.heating = Some(sp);
        }
        if let Some(sp) = patch.set_point_cooling {
            next.setpoints.cooling = Some(sp);
        }
        next
    }

    pub fn is_on(&self) -> bool {
        self.on.unwrap_or(false)
    }

    /// The cloud mode, if it is one we recognize.
    pub fn vent_mode(&self) -> Option<VentMode> {
        self.mode.as_deref().and_then(|m| m.parse().ok())
    }

    /// Host-facing mode: off when the unit is off, unknown modes read as auto.
    pub fn hvac_mode(&self) -> HvacMode {
        if !self.is_on() {
            return HvacMode::Off;
        }
        self.vent_mode().map_or(HvacMode::Auto, HvacMode::from)
    }

    /// The setpoint that applies in the current mode.
    pub fn target_temperature(&self) -> Option<f64> {
        match self.vent_mode() {
            Some(VentMode::Heating) => self.setpoints.heating,
            Some(VentMode::Cooling) => self.setpoints.cooling,
            _ => self.setpoints.set_point.or(self.setpoints.auto_mode),
        }
    }

    /// Setpoint carried by a command when the caller does not change it.
    pub fn effective_setpoint(&self) -> f64 {
        self.target_temperature()
            .or(self.setpoints.set_point)
            .or(self.setpoints.heating)
            .or(self.setpoints.cooling)
            .unwrap_or(FALLBACK_SETPOINT)
    }

    /// `(min, max)` allowed for the current mode. Outside heating and
    /// cooling the range spans heating-min to cooling-max.
    pub fn setpoint_bounds(&self) -> (Option<f64>, Option<f64>) {
        let sp = &self.setpoints;
        match self.vent_mode() {
            Some(VentMode::Heating) => (sp.heating_min, sp.heating_max),
            Some(VentMode::Cooling) => (sp.cooling_min, sp.cooling_max),
            _ => (sp.heating_min, sp.cooling_max),
        }
    }

    pub fn clamp_setpoint(&self, value: f64) -> f64 {
        let (min, max) = self.setpoint_bounds();
        let value = min.map_or(value, |m| value.max(m));
        max.map_or(value, |m| value.min(m))
    }
}

// ── Patch ────────────────────────────────────────────────────────────

/// Partial [`VentState`]: the fields a command wants to set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_point_heating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_point_cooling: Option<f64>,
}

impl VentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&sabiana_api::VentCommand> for VentPatch {
    fn from(cmd: &sabiana_api::VentCommand) -> Self {
        Self {
            on: Some(cmd.on),
            mode: Some(cmd.mode.clone()),
            fan: Some(cmd.fan.clone()),
            set_point: Some(cmd.set_point),
            ..Self::default()
        }
    }
}
