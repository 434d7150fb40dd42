// ── Polling coordinator ──
//
// Owns the poll loop and the published snapshot for one Sabiana Cloud
// account. Polls fetch authoritative state, reconcile it against pending
// writes and publish the merged result. Commands record a pending write,
// overlay it onto the published snapshot and only then reach the network.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sabiana_api::{SabianaClient, TransportConfig};

use crate::clock::{Clock, SystemClock};
use crate::command::{self, Command, CommandResult};
use crate::config::CoordinatorConfig;
use crate::convert::flatten_groups;
use crate::diagnostics::Diagnostics;
use crate::error::CoreError;
use crate::model::{CoordinatorSnapshot, DeviceIdentity, DeviceSnapshot, VentPatch};
use crate::pending::PendingWriteTracker;
use crate::store::{SnapshotStore, UpdateStatus};
use crate::stream::SnapshotStream;

// ── State ────────────────────────────────────────────────────────

/// Poll state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Fetching,
}

/// What a call to [`Coordinator::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A poll ran and a new snapshot was published.
    Updated,
    /// Another poll was already in flight; nothing was done.
    Skipped,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. One coordinator serves
/// one configured account; pass clones to whatever needs to read
/// snapshots or dispatch commands.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    client: SabianaClient,
    store: SnapshotStore,
    pending: Arc<PendingWriteTracker>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<CoordinatorState>,
    /// Held for the whole of a poll. `try_lock` failing means skip.
    fetch_gate: Mutex<()>,
    /// Serializes reconcile+publish against mark+overlay. Never held
    /// across network I/O.
    merge_lock: Mutex<()>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Build a coordinator and its HTTP client from configuration. Does
    /// NOT poll: call [`start()`](Self::start) or [`refresh()`](Self::refresh).
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let transport = TransportConfig::with_timeout(config.timeout);
        let client =
            SabianaClient::from_api_key(config.base_url.as_str(), &config.api_key, &transport)?;
        Ok(Self::with_client(client, config))
    }

    /// Use an already-built client (tests, shared connection pools).
    pub fn with_client(client: SabianaClient, config: CoordinatorConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    /// Use an already-built client and a custom clock for stamping
    /// pending writes.
    pub fn with_clock(
        client: SabianaClient,
        config: CoordinatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Idle);
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                client,
                store: SnapshotStore::new(),
                pending: Arc::new(PendingWriteTracker::new()),
                clock,
                state,
                fetch_gate: Mutex::new(()),
                merge_lock: Mutex::new(()),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &SabianaClient {
        &self.inner.client
    }

    /// Read-only view of the pending writes consulted on every poll.
    pub fn pending(&self) -> &Arc<PendingWriteTracker> {
        &self.inner.pending
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the first poll and spawn the periodic refresh task.
    ///
    /// A failed first poll is logged and recorded in [`status()`](Self::status);
    /// polling continues on schedule either way.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Shutdown);
        }

        info!(
            base_url = %self.inner.config.base_url,
            interval_secs = self.inner.config.poll_interval.as_secs(),
            "starting coordinator"
        );

        if self.refresh().await.is_err() {
            debug!("initial poll failed, retrying on schedule");
        }

        self.spawn_polling().await
    }

    /// Spawn the periodic refresh task without polling first. The first
    /// scheduled poll runs one interval from now. Does nothing when the
    /// interval is zero.
    pub async fn spawn_polling(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Shutdown);
        }

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(coordinator, interval, cancel)));
        }
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("coordinator stopped");
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Poll once now.
    ///
    /// Returns [`RefreshOutcome::Skipped`] without doing anything if a poll
    /// is already running. On failure the previous snapshot stays
    /// published and the error is recorded in [`status()`](Self::status).
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        let Ok(_gate) = self.inner.fetch_gate.try_lock() else {
            debug!("poll already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };
        let _fetching = FetchingGuard::enter(&self.inner.state);

        match self.poll_once().await {
            Ok(()) => Ok(RefreshOutcome::Updated),
            Err(e) => {
                warn!(error = %e, "poll failed, keeping previous snapshot");
                self.inner.store.record_failure(Utc::now(), e.to_string());
                Err(e)
            }
        }
    }

    async fn poll_once(&self) -> Result<(), CoreError> {
        let groups = self.inner.client.list_vent().await?;
        let candidates = flatten_groups(&groups);

        let _merge = self.inner.merge_lock.lock().await;

        if let Some(ttl) = self.inner.config.pending_ttl {
            self.inner.pending.expire_older_than(self.now_millis(), ttl);
        }

        let units: Vec<Arc<DeviceSnapshot>> = candidates
            .into_iter()
            .map(|unit| {
                let overlay = self
                    .inner
                    .pending
                    .reconcile(&unit.identity(), unit.last_update_millis());
                Arc::new(match overlay {
                    Some(patch) => unit.with_overlay(&patch),
                    None => unit,
                })
            })
            .collect();

        let now = Utc::now();
        let snapshot = CoordinatorSnapshot {
            groups,
            units,
            fetched_at: Some(now),
        };
        debug!(
            groups = snapshot.groups.len(),
            units = snapshot.units.len(),
            pending = snapshot.pending_count(),
            "poll complete"
        );

        self.inner.store.publish(snapshot);
        self.inner.store.record_success(now);
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Dispatch a command to a vent unit.
    ///
    /// The command is resolved against the unit's current (possibly
    /// overlaid) state, recorded as a pending write and overlaid onto the
    /// published snapshot before the request is sent. A failed request is
    /// returned as an error but the overlay and pending record stay: the
    /// next confirming poll, a newer command or the TTL clears them.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let identity = cmd.identity().clone();

        let (intent, since_millis) = {
            let _merge = self.inner.merge_lock.lock().await;
            let snapshot = self.inner.store.snapshot();
            let unit = snapshot
                .unit(&identity)
                .ok_or_else(|| CoreError::DeviceNotFound {
                    identifier: identity.to_string(),
                })?;

            let intent = command::resolve(&cmd, &unit.vent)?;
            let since_millis = self.now_millis();
            self.inner
                .pending
                .mark_pending(identity.clone(), intent.patch.clone(), since_millis);
            self.inner
                .store
                .publish(snapshot.with_unit_replaced(unit.with_overlay(&intent.patch)));
            (intent, since_millis)
        };

        if let Err(e) = self
            .inner
            .client
            .cmd_vent(&identity.address, &intent.command)
            .await
        {
            warn!(device = %identity, error = %e, "vent command failed, optimistic state kept");
            return Err(e.into());
        }

        info!(
            device = %identity,
            mode = %intent.command.mode,
            on = intent.command.on,
            "vent command accepted"
        );
        Ok(CommandResult {
            identity,
            command: intent.command,
            since_millis,
        })
    }

    /// Record a pending write and overlay it onto the published snapshot
    /// without sending anything. Returns the stamp it was recorded with.
    pub async fn mark_pending(&self, identity: DeviceIdentity, patch: VentPatch) -> i64 {
        let _merge = self.inner.merge_lock.lock().await;
        let since_millis = self.now_millis();
        let snapshot = self.inner.store.snapshot();

        if let Some(unit) = snapshot.unit(&identity) {
            self.inner
                .store
                .publish(snapshot.with_unit_replaced(unit.with_overlay(&patch)));
        }
        self.inner.pending.mark_pending(identity, patch, since_millis);
        since_millis
    }

    /// Epoch milliseconds used to stamp pending writes.
    pub fn now_millis(&self) -> i64 {
        self.inner
            .clock
            .now_millis()
            .saturating_add(self.inner.config.clock_offset_ms)
    }

    // ── Readers ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<CoordinatorSnapshot> {
        self.inner.store.snapshot()
    }

    pub fn units(&self) -> Vec<Arc<DeviceSnapshot>> {
        self.inner.store.snapshot().units.clone()
    }

    pub fn unit(&self, identity: &DeviceIdentity) -> Option<Arc<DeviceSnapshot>> {
        self.inner.store.snapshot().unit(identity)
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.store.subscribe())
    }

    pub fn status(&self) -> UpdateStatus {
        self.inner.store.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<UpdateStatus> {
        self.inner.store.subscribe_status()
    }

    pub fn state(&self) -> CoordinatorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Redacted dump of configuration, poll health and pending writes.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::collect(self)
    }
}

// ── Fetching guard ───────────────────────────────────────────────

/// Sets `Fetching` on entry and `Idle` on drop, so the state recovers
/// even if the poll future is cancelled.
struct FetchingGuard<'a> {
    state: &'a watch::Sender<CoordinatorState>,
}

impl<'a> FetchingGuard<'a> {
    fn enter(state: &'a watch::Sender<CoordinatorState>) -> Self {
        state.send_replace(CoordinatorState::Fetching);
        Self { state }
    }
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(CoordinatorState::Idle);
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll on a fixed interval until cancelled. Failures are already logged
/// and recorded by `refresh`; the next tick runs regardless.
async fn refresh_task(coordinator: Coordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let _ = coordinator.refresh().await;
            }
        }
    }
    debug!("refresh task stopped");
}
