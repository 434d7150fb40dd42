// ── Pending-write tracker ──
//
// One record per device with an unconfirmed command. A record lives until
// a poll reports `lastUpdate >= since_millis` for that device, or until a
// configured TTL drops it. A newer command for the same device replaces
// the record outright.
//
// Only the coordinator writes here, under its merge lock; everyone else
// gets the read side.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::model::{DeviceIdentity, VentPatch};

/// An unconfirmed command: what the user asked for, and when.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWrite {
    /// Epoch milliseconds at dispatch, on the coordinator's clock.
    pub since_millis: i64,
    pub desired: VentPatch,
}

/// Concurrent map of pending writes keyed by device.
#[derive(Debug, Default)]
pub struct PendingWriteTracker {
    records: DashMap<DeviceIdentity, PendingWrite>,
}

impl PendingWriteTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the pending write for `identity`.
    pub(crate) fn mark_pending(
        &self,
        identity: DeviceIdentity,
        desired: VentPatch,
        now_millis: i64,
    ) {
        debug!(device = %identity, since = now_millis, "marking write pending");
        self.records.insert(
            identity,
            PendingWrite {
                since_millis: now_millis,
                desired,
            },
        );
    }

    /// Decide what to overlay for `identity` given a poll's `lastUpdate`.
    ///
    /// Returns the desired patch while the write is still unconfirmed. A
    /// `last_update_millis` at or past the record's `since_millis` confirms
    /// it: the record is dropped and `None` comes back.
    pub(crate) fn reconcile(
        &self,
        identity: &DeviceIdentity,
        last_update_millis: i64,
    ) -> Option<VentPatch> {
        if let Some((_, confirmed)) = self
            .records
            .remove_if(identity, |_, w| last_update_millis >= w.since_millis)
        {
            debug!(
                device = %identity,
                since = confirmed.since_millis,
                last_update = last_update_millis,
                "pending write confirmed"
            );
            return None;
        }
        self.records.get(identity).map(|w| w.desired.clone())
    }

    /// Drop records older than `ttl`. Returns how many went.
    pub(crate) fn expire_older_than(&self, now_millis: i64, ttl: Duration) -> usize {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let before = self.records.len();
        self.records
            .retain(|_, w| now_millis.saturating_sub(w.since_millis) < ttl_ms);
        let expired = before.saturating_sub(self.records.len());
        if expired > 0 {
            debug!(expired, "pending writes expired");
        }
        expired
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<PendingWrite> {
        self.records.get(identity).map(|r| r.value().clone())
    }

    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        self.records.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Devices with a pending write, sorted.
    pub fn identities(&self) -> Vec<DeviceIdentity> {
        let mut ids: Vec<_> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// All records, sorted by device.
    pub fn entries(&self) -> Vec<(DeviceIdentity, PendingWrite)> {
        let mut entries: Vec<_> = self
            .records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
