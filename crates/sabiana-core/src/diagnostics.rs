// ── Diagnostics ──
//
// A serializable dump of one coordinator for bug reports. The API key is
// never part of it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use sabiana_api::Group;

use crate::coordinator::Coordinator;
use crate::model::{DeviceIdentity, DeviceSnapshot, VentPatch};
use crate::store::UpdateStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub config: ConfigSummary,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub fetched_at: Option<DateTime<Utc>>,
    pub units: Vec<Arc<DeviceSnapshot>>,
    pub groups: Vec<Group>,
    pub pending: Vec<PendingEntry>,
}

/// Configuration with secrets left out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSummary {
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub pending_ttl_secs: Option<u64>,
    pub clock_offset_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEntry {
    pub group_id: String,
    pub address: String,
    pub since_millis: i64,
    pub desired: VentPatch,
}

impl Diagnostics {
    pub fn collect(coordinator: &Coordinator) -> Self {
        let config = coordinator.config();
        let snapshot = coordinator.snapshot();
        let UpdateStatus {
            last_update_success,
            last_error,
            last_success_at,
            consecutive_failures,
            ..
        } = coordinator.status();

        let pending = coordinator
            .pending()
            .entries()
            .into_iter()
            .map(|(DeviceIdentity { group_id, address }, write)| PendingEntry {
                group_id,
                address,
                since_millis: write.since_millis,
                desired: write.desired,
            })
            .collect();

        Self {
            config: ConfigSummary {
                base_url: config.base_url.to_string(),
                poll_interval_secs: config.poll_interval.as_secs(),
                timeout_secs: config.timeout.as_secs(),
                pending_ttl_secs: config.pending_ttl.map(|d| d.as_secs()),
                clock_offset_ms: config.clock_offset_ms,
            },
            last_update_success,
            last_error,
            last_success_at,
            consecutive_failures,
            fetched_at: snapshot.fetched_at,
            units: snapshot.units.clone(),
            groups: snapshot.groups.clone(),
            pending,
        }
    }
}
