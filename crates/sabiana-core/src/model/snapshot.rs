// ── Published snapshots ──
//
// Everything here is immutable once built. A poll or a command produces a
// fresh `CoordinatorSnapshot`; readers hold `Arc`s to whichever one was
// current when they looked.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use sabiana_api::Group;

use super::identity::DeviceIdentity;
use super::vent::{VentPatch, VentState};

/// Projection of one vent unit as presentation sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub group_id: String,
    pub group_name: Option<String>,
    pub name: Option<String>,
    pub address: String,
    /// Epoch milliseconds of the last authoritative change.
    pub last_update: Option<i64>,
    pub controller_type: Option<String>,
    pub unit_type: Option<String>,
    pub vent: VentState,
    /// An unconfirmed command is overlaid onto `vent`.
    pub pending: bool,
}

impl DeviceSnapshot {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.group_id.clone(), self.address.clone())
    }

    pub fn is(&self, identity: &DeviceIdentity) -> bool {
        self.group_id == identity.group_id && self.address == identity.address
    }

    /// `lastUpdate` for reconciliation. A unit that never reported one
    /// counts as 0, so it can never confirm a pending write.
    pub fn last_update_millis(&self) -> i64 {
        self.last_update.unwrap_or(0)
    }

    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        self.last_update
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Unit name, falling back to the address.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.address)
    }

    /// Copy with `patch` overlaid and `pending` set.
    #[must_use]
    pub fn with_overlay(&self, patch: &VentPatch) -> Self {
        Self {
            vent: self.vent.overlay(patch),
            pending: true,
            ..self.clone()
        }
    }
}

/// The aggregate published after every poll and every command.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSnapshot {
    /// Raw groups from the last successful poll, sensor units included.
    pub groups: Vec<Group>,
    pub units: Vec<Arc<DeviceSnapshot>>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CoordinatorSnapshot {
    /// Nothing fetched yet.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn unit(&self, identity: &DeviceIdentity) -> Option<Arc<DeviceSnapshot>> {
        self.units.iter().find(|u| u.is(identity)).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.units.iter().filter(|u| u.pending).count()
    }

    /// Copy with the unit matching `replacement`'s identity swapped out.
    /// Units are shared with `self`, so this is cheap.
    #[must_use]
    pub fn with_unit_replaced(&self, replacement: DeviceSnapshot) -> Self {
        let replacement = Arc::new(replacement);
        let units = self
            .units
            .iter()
            .map(|u| {
                if u.group_id == replacement.group_id && u.address == replacement.address {
                    Arc::clone(&replacement)
                } else {
                    Arc::clone(u)
                }
            })
            .collect();
        Self {
            groups: self.groups.clone(),
            units,
            fetched_at: self.fetched_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unit(group: &str, address: &str) -> DeviceSnapshot {
        DeviceSnapshot {
            group_id: group.into(),
            group_name: None,
            name: None,
            address: address.into(),
            last_update: None,
            controller_type: None,
            unit_type: Some("vent".into()),
            vent: VentState::default(),
            pending: false,
        }
    }

    #[test]
    fn missing_last_update_is_zero() {
        let u = unit("g", "a");
        assert_eq!(u.last_update_millis(), 0);
        assert!(u.last_update_at().is_none());
        assert_eq!(u.display_name(), "a");
    }

    #[test]
    fn replace_touches_only_matching_unit() {
        let snap = CoordinatorSnapshot {
            units: vec![Arc::new(unit("g", "a")), Arc::new(unit("g", "b"))],
            ..CoordinatorSnapshot::default()
        };
        let patch = VentPatch {
            on: Some(true),
            ..VentPatch::default()
        };
        let replaced = snap.unit(&DeviceIdentity::new("g", "b")).unwrap().with_overlay(&patch);

        let next = snap.with_unit_replaced(replaced);

        assert_eq!(next.pending_count(), 1);
        assert!(Arc::ptr_eq(&next.units[0], &snap.units[0]));
        assert!(next.unit(&DeviceIdentity::new("g", "b")).unwrap().vent.is_on());
        assert_eq!(snap.pending_count(), 0);
    }
}
