// ── Snapshot store ──
//
// Holds the current `CoordinatorSnapshot` behind an `ArcSwap` for
// lock-free reads and mirrors every publish into a `watch` channel for
// subscribers. Poll health lives in a second channel so a failed poll can
// be reported without touching the snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::model::CoordinatorSnapshot;

/// Outcome of the most recent poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

pub(crate) struct SnapshotStore {
    current: ArcSwap<CoordinatorSnapshot>,
    snapshot_tx: watch::Sender<Arc<CoordinatorSnapshot>>,
    status_tx: watch::Sender<UpdateStatus>,
}

impl SnapshotStore {
    pub(crate) fn new() -> Self {
        let initial = Arc::new(CoordinatorSnapshot::empty());
        let (snapshot_tx, _) = watch::channel(Arc::clone(&initial));
        let (status_tx, _) = watch::channel(UpdateStatus::default());
        Self {
            current: ArcSwap::new(initial),
            snapshot_tx,
            status_tx,
        }
    }

    /// Replace the current snapshot and notify subscribers.
    pub(crate) fn publish(&self, snapshot: CoordinatorSnapshot) {
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot_tx.send_replace(snapshot);
    }

    pub(crate) fn snapshot(&self) -> Arc<CoordinatorSnapshot> {
        self.current.load_full()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<CoordinatorSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub(crate) fn status(&self) -> UpdateStatus {
        self.status_tx.borrow().clone()
    }

    pub(crate) fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.status_tx.subscribe()
    }

    pub(crate) fn record_success(&self, at: DateTime<Utc>) {
        self.status_tx.send_modify(|s| {
            s.last_update_success = true;
            s.last_error = None;
            s.last_success_at = Some(at);
            s.last_attempt_at = Some(at);
            s.consecutive_failures = 0;
        });
    }

    pub(crate) fn record_failure(&self, at: DateTime<Utc>, error: String) {
        self.status_tx.send_modify(|s| {
            s.last_update_success = false;
            s.last_error = Some(error);
            s.last_attempt_at = Some(at);
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        });
    }
}
