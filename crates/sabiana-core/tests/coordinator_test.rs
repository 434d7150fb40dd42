// End-to-end tests for `Coordinator` against a wiremock cloud.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sabiana_core::{
    ApiErrorKind, Command, Coordinator, CoordinatorConfig, CoordinatorState, CoreError,
    DeviceIdentity, HvacMode, ManualClock, RefreshOutcome, SabianaClient, VentPatch,
};

// ── Helpers ─────────────────────────────────────────────────────────

const API_KEY: &str = "super-secret-key";

fn config(server: &MockServer) -> CoordinatorConfig {
    CoordinatorConfig::new(SecretString::from(API_KEY.to_owned()))
        .unwrap()
        .with_base_url(Url::parse(&server.uri()).unwrap())
        .with_poll_interval(Duration::ZERO)
}

fn coordinator(server: &MockServer, cfg: CoordinatorConfig, clock: &Arc<ManualClock>) -> Coordinator {
    let client = SabianaClient::from_api_key(
        &server.uri(),
        &cfg.api_key,
        &sabiana_api::TransportConfig::default(),
    )
    .unwrap();
    Coordinator::with_clock(client, cfg, Arc::clone(clock) as Arc<dyn sabiana_core::Clock>)
}

fn living_room() -> DeviceIdentity {
    DeviceIdentity::new("g1", "0A1B")
}

fn vent_list(last_update: i64, mode: &str) -> Value {
    json!([
        {
            "groupId": "g1",
            "groupName": "Home",
            "units": [
                {
                    "address": "0A1B",
                    "name": "Living room",
                    "unitType": "vent",
                    "lastUpdate": last_update,
                    "ventUnit": {
                        "on": true,
                        "mode": mode,
                        "fan": "V1",
                        "t1": 21.0,
                        "setPoint": 22.0,
                        "setPointHeating": 21.0,
                        "setPointCooling": 25.0
                    }
                },
                {
                    "address": "5E45",
                    "name": "Hall sensor",
                    "unitType": "sensor"
                }
            ]
        }
    ])
}

async fn mount_list(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v1/vent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_command(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/v1/cmd/vent/0A1B"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

fn heat(identity: DeviceIdentity) -> Command {
    Command::SetHvacMode {
        identity,
        mode: HvacMode::Heat,
    }
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_poll_without_pending_shows_server_state() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);

    assert_eq!(coord.refresh().await.unwrap(), RefreshOutcome::Updated);

    let unit = coord.unit(&living_room()).unwrap();
    assert!(!unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("cooling"));
    assert_eq!(unit.last_update, Some(900));
    assert!(coord.status().last_update_success);
    assert_eq!(coord.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_sensor_units_are_excluded() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);

    coord.refresh().await.unwrap();

    let snapshot = coord.snapshot();
    assert_eq!(snapshot.units.len(), 1);
    assert!(coord.unit(&DeviceIdentity::new("g1", "5E45")).is_none());
    // raw groups keep everything the server sent
    assert_eq!(snapshot.groups[0].units.len(), 2);
}

#[tokio::test]
async fn test_pending_write_survives_stale_poll_and_clears_on_confirmation() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    mount_command(&server, 200).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    let result = coord.execute(heat(living_room())).await.unwrap();
    assert_eq!(result.since_millis, 1000);
    assert_eq!(result.command.mode, "heating");

    // stale poll: lastUpdate 900 < since 1000
    coord.refresh().await.unwrap();
    let unit = coord.unit(&living_room()).unwrap();
    assert!(unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("heating"));
    assert_eq!(coord.pending().len(), 1);

    // confirming poll: lastUpdate 1001 >= since 1000
    server.reset().await;
    mount_list(&server, vent_list(1001, "cooling")).await;
    coord.refresh().await.unwrap();

    let unit = coord.unit(&living_room()).unwrap();
    assert!(!unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("cooling"));
    assert!(coord.pending().is_empty());

    // and it does not come back on a later stale poll
    server.reset().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    coord.refresh().await.unwrap();
    assert!(!coord.unit(&living_room()).unwrap().pending);
}

#[tokio::test]
async fn test_failed_poll_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();
    let before = coord.snapshot();

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = coord.refresh().await.unwrap_err();
    assert_eq!(err.kind(), Some(ApiErrorKind::Transport));

    assert!(Arc::ptr_eq(&before, &coord.snapshot()));
    let status = coord.status();
    assert!(!status.last_update_success);
    assert!(status.last_error.unwrap().contains("500"));
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_success_at.is_some());
    assert_eq!(coord.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_overlapping_refresh_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/vent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vent_list(900, "cooling"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);

    let background = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(coord.state(), CoordinatorState::Fetching);
    assert_eq!(coord.refresh().await.unwrap(), RefreshOutcome::Skipped);

    assert_eq!(background.await.unwrap().unwrap(), RefreshOutcome::Updated);
    assert_eq!(coord.state(), CoordinatorState::Idle);
}

#[tokio::test]
async fn test_malformed_sibling_unit_does_not_fail_poll() {
    let server = MockServer::start().await;
    let mut list = vent_list(900, "cooling");
    let units = list[0]["units"].as_array_mut().unwrap();
    units[1] = json!({ "address": "5E45", "name": 7, "unitType": 3, "ventUnit": [] });
    units.push(json!("garbage"));
    mount_list(&server, list).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);

    assert_eq!(coord.refresh().await.unwrap(), RefreshOutcome::Updated);

    let snapshot = coord.snapshot();
    assert_eq!(snapshot.units.len(), 1);
    assert_eq!(
        coord.unit(&living_room()).unwrap().vent.mode.as_deref(),
        Some("cooling")
    );
    assert!(coord.status().last_update_success);
}

#[tokio::test]
async fn test_command_during_inflight_poll_survives_stale_response() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/vent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vent_list(900, "cooling"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_command(&server, 200).await;

    let poll = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.refresh().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    coord.execute(heat(living_room())).await.unwrap();
    assert!(!poll.is_finished());

    assert_eq!(poll.await.unwrap().unwrap(), RefreshOutcome::Updated);

    let unit = coord.unit(&living_room()).unwrap();
    assert!(unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("heating"));
    assert_eq!(coord.pending().len(), 1);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_command_overlay_is_visible_before_response() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/cmd/vent/0A1B"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    let mut stream = coord.subscribe();
    let dispatch = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.execute(heat(living_room())).await })
    };

    let snapshot = tokio::time::timeout(Duration::from_millis(250), stream.changed())
        .await
        .unwrap()
        .unwrap();
    let unit = snapshot.unit(&living_room()).unwrap();
    assert!(unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("heating"));

    dispatch.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_forbidden_command_keeps_overlay_and_pending() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    mount_command(&server, 403).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    let err = coord.execute(heat(living_room())).await.unwrap_err();
    assert!(matches!(err, CoreError::AuthenticationFailed { .. }), "got {err:?}");

    let unit = coord.unit(&living_room()).unwrap();
    assert!(unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("heating"));
    let record = coord.pending().get(&living_room()).unwrap();
    assert_eq!(record.since_millis, 1000);
}

#[tokio::test]
async fn test_second_command_replaces_pending_write() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    mount_command(&server, 200).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    coord.execute(heat(living_room())).await.unwrap();
    clock.advance(500);
    coord
        .execute(Command::SetFanMode {
            identity: living_room(),
            fan: "V3".into(),
        })
        .await
        .unwrap();

    assert_eq!(coord.pending().len(), 1);
    let record = coord.pending().get(&living_room()).unwrap();
    assert_eq!(record.since_millis, 1500);
    assert_eq!(record.desired.fan.as_deref(), Some("V3"));
    // the fan command was resolved against the overlaid mode
    assert_eq!(record.desired.mode.as_deref(), Some("heating"));

    // a poll newer than the first command but older than the second
    server.reset().await;
    mount_list(&server, vent_list(1200, "cooling")).await;
    coord.refresh().await.unwrap();
    let unit = coord.unit(&living_room()).unwrap();
    assert!(unit.pending);
    assert_eq!(unit.vent.fan.as_deref(), Some("V3"));
}

#[tokio::test]
async fn test_command_for_unknown_unit() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    let err = coord
        .execute(heat(DeviceIdentity::new("g1", "5E45")))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DeviceNotFound { .. }));
    assert!(coord.pending().is_empty());
}

#[tokio::test]
async fn test_set_temperature_is_clamped_and_sent() {
    let server = MockServer::start().await;
    let mut list = vent_list(900, "heating");
    list[0]["units"][0]["ventUnit"]["setPointHeatingMax"] = json!(26.0);
    mount_list(&server, list).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/cmd/vent/0A1B"))
        .and(wiremock::matchers::body_json(json!({
            "on": true, "mode": "heating", "fan": "V1", "setPoint": 26.0
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    coord
        .execute(Command::SetTemperature {
            identity: living_room(),
            temperature: 30.0,
        })
        .await
        .unwrap();

    let unit = coord.unit(&living_room()).unwrap();
    assert_eq!(unit.vent.target_temperature(), Some(26.0));
}

// ── Expiry and clock basis ──────────────────────────────────────────

#[tokio::test]
async fn test_pending_ttl_expires_unconfirmed_write() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    mount_command(&server, 200).await;
    let clock = Arc::new(ManualClock::new(1000));
    let mut cfg = config(&server);
    cfg.pending_ttl = Some(Duration::from_secs(60));
    let coord = coordinator(&server, cfg, &clock);
    coord.refresh().await.unwrap();

    coord.execute(heat(living_room())).await.unwrap();
    clock.advance(30_000);
    coord.refresh().await.unwrap();
    assert!(coord.unit(&living_room()).unwrap().pending);

    clock.advance(31_000);
    coord.refresh().await.unwrap();
    let unit = coord.unit(&living_room()).unwrap();
    assert!(!unit.pending);
    assert_eq!(unit.vent.mode.as_deref(), Some("cooling"));
}

#[tokio::test]
async fn test_clock_offset_shifts_pending_stamp() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(600, "cooling")).await;
    mount_command(&server, 200).await;
    let clock = Arc::new(ManualClock::new(1000));
    let mut cfg = config(&server);
    cfg.clock_offset_ms = -500;
    let coord = coordinator(&server, cfg, &clock);
    coord.refresh().await.unwrap();

    let result = coord.execute(heat(living_room())).await.unwrap();
    assert_eq!(result.since_millis, 500);

    // 600 >= 500 confirms immediately
    coord.refresh().await.unwrap();
    assert!(coord.pending().is_empty());
}

#[tokio::test]
async fn test_mark_pending_without_command() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();

    let since = coord
        .mark_pending(
            living_room(),
            VentPatch {
                on: Some(false),
                ..VentPatch::default()
            },
        )
        .await;

    assert_eq!(since, 1000);
    let unit = coord.unit(&living_room()).unwrap();
    assert!(unit.pending);
    assert!(!unit.vent.is_on());
}

// ── Lifecycle & diagnostics ─────────────────────────────────────────

#[tokio::test]
async fn test_start_polls_until_shutdown() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let cfg = config(&server).with_poll_interval(Duration::from_millis(50));
    let coord = coordinator(&server, cfg, &clock);

    coord.start().await.unwrap();
    let first = coord.snapshot().fetched_at.unwrap();

    let mut stream = coord.subscribe();
    let next = tokio::time::timeout(Duration::from_secs(2), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(next.fetched_at.unwrap() >= first);

    coord.shutdown().await;
    assert!(matches!(coord.start().await, Err(CoreError::Shutdown)));
}

#[tokio::test]
async fn test_spawn_polling_waits_one_interval() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let cfg = config(&server).with_poll_interval(Duration::from_millis(50));
    let coord = coordinator(&server, cfg, &clock);

    let mut stream = coord.subscribe();
    coord.spawn_polling().await.unwrap();
    assert!(coord.snapshot().fetched_at.is_none());

    let next = tokio::time::timeout(Duration::from_secs(2), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.units.len(), 1);

    coord.shutdown().await;
    assert!(matches!(coord.spawn_polling().await, Err(CoreError::Shutdown)));
}

#[tokio::test]
async fn test_snapshot_stream_yields_current_then_updates() {
    use futures_util::StreamExt;

    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);

    let mut stream = coord.subscribe().into_stream();
    let first = stream.next().await.unwrap();
    assert!(first.units.is_empty());
    assert!(first.fetched_at.is_none());

    coord.refresh().await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.units.len(), 1);
}

#[tokio::test]
async fn test_diagnostics_never_include_api_key() {
    let server = MockServer::start().await;
    mount_list(&server, vent_list(900, "cooling")).await;
    mount_command(&server, 200).await;
    let clock = Arc::new(ManualClock::new(1000));
    let coord = coordinator(&server, config(&server), &clock);
    coord.refresh().await.unwrap();
    coord.execute(heat(living_room())).await.unwrap();

    let diagnostics = coord.diagnostics();
    assert!(diagnostics.last_update_success);
    assert_eq!(diagnostics.units.len(), 1);
    assert_eq!(diagnostics.pending.len(), 1);
    assert_eq!(diagnostics.pending[0].since_millis, 1000);

    let dump = serde_json::to_string(&diagnostics).unwrap();
    assert!(!dump.contains(API_KEY));
    assert!(dump.contains("\"lastUpdateSuccess\":true"));
}
