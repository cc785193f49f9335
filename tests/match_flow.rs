use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};
use tokio::{sync::mpsc, time::sleep};

use scoreboard_back::{
    config::AppConfig,
    dao::snapshot_store::{SnapshotStore, file::FileSnapshotStore, memory::InMemorySnapshotStore},
    dto::ws::{Ack, ServerMessage},
    services::{match_service, persistence, session_service, websocket_service::handle_frame},
    state::{
        AppState, SharedState,
        clock::ManualClock,
        match_state::{EndReason, Side},
        session::SessionId,
    },
};

async fn boot(store: Arc<dyn SnapshotStore>, clock: Arc<ManualClock>) -> SharedState {
    let state = AppState::bootstrap(AppConfig::default(), clock, store).await;
    persistence::spawn_persister(state.clone());
    state
}

async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within one second");
}

fn error_code(ack: Ack) -> Option<String> {
    ack.error.map(|e| e.code)
}

fn connect(state: &SharedState) -> SessionId {
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    drop(rx);
    session_service::connect(state, tx)
}

async fn send(state: &SharedState, session: SessionId, frame: Value) -> Ack {
    handle_frame(state, session, &frame.to_string())
        .await
        .expect("request frames are acknowledged")
}

#[tokio::test]
async fn controller_runs_a_match_to_a_gap_win() {
    let clock = Arc::new(ManualClock::new(50_000));
    let store = InMemorySnapshotStore::new();
    let state = boot(Arc::new(store.clone()), clock.clone()).await;
    let mut events = state.events().subscribe();

    let display = connect(&state);
    let ack = send(&state, display, json!({ "type": "auth:login", "role": "display" })).await;
    assert!(ack.ok);

    let controller = connect(&state);
    let ack = send(
        &state,
        controller,
        json!({ "type": "auth:login", "role": "control", "pin": "0000" }),
    )
    .await;
    assert!(ack.ok);
    assert!(send(&state, controller, json!({ "type": "control:lock:claim" })).await.ok);

    let ack = send(&state, display, json!({ "type": "score:add", "side": "left", "delta": 1 })).await;
    assert_eq!(ack.error.map(|e| e.code).as_deref(), Some("NOT_CONTROLLER"));

    send(&state, controller, json!({ "type": "timer:set", "initialMs": 120000 })).await;
    send(&state, controller, json!({ "type": "timer:start" })).await;
    clock.advance(1_000);
    match_service::tick(&state).await;

    for delta in [1, 3, 3, 1] {
        let ack = send(
            &state,
            controller,
            json!({ "type": "score:add", "side": "red", "delta": delta }),
        )
        .await;
        assert!(ack.ok);
    }

    let snapshot = state.match_state().lock().await.clone();
    assert!(snapshot.ended.over);
    assert_eq!(snapshot.ended.reason, Some(EndReason::Gap));
    assert_eq!(snapshot.ended.winner, Some(Side::Left));
    assert!(!snapshot.timer.running);
    assert_eq!(snapshot.timer.remaining_ms, 119_000);

    let ended: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|event| matches!(event, ServerMessage::Ended { .. }))
        .collect();
    assert_eq!(ended.len(), 1);

    let ack = send(&state, controller, json!({ "type": "timer:start" })).await;
    assert_eq!(ack.error.map(|e| e.code).as_deref(), Some("MATCH_ENDED"));

    let ack = send(&state, controller, json!({ "type": "timer:reset", "id": 11 })).await;
    assert_eq!(ack.id, Some(11));
    assert!(ack.match_id.is_some());
    assert_ne!(ack.match_id, Some(snapshot.match_id));

    let match_id = json!(ack.match_id.unwrap());
    eventually(|| store.last_match().is_some_and(|saved| saved["matchId"] == match_id)).await;
    assert_eq!(store.last_match().unwrap()["ended"]["over"], false);
}

#[tokio::test]
async fn large_score_correction_reaches_the_gap() {
    let state = boot(
        Arc::new(InMemorySnapshotStore::new()),
        Arc::new(ManualClock::new(0)),
    )
    .await;
    let controller = connect(&state);
    send(
        &state,
        controller,
        json!({ "type": "auth:login", "role": "controller", "pin": "0000" }),
    )
    .await;
    send(&state, controller, json!({ "type": "control:lock:claim" })).await;
    send(&state, controller, json!({ "type": "timer:set", "initialMs": 180000 })).await;
    let ack = send(&state, controller, json!({ "type": "rules:set", "pointGap": 8 })).await;
    assert!(ack.ok);

    let ack = send(&state, controller, json!({ "type": "score:add", "side": "left", "delta": 1 })).await;
    assert!(ack.ok);
    assert_eq!(state.match_state().lock().await.priority_marker, Some(Side::Left));

    let ack = send(&state, controller, json!({ "type": "score:add", "side": "left", "delta": 7 })).await;
    assert!(ack.ok);
    let ack = send(&state, controller, json!({ "type": "score:add", "side": "right", "delta": 0 })).await;
    assert_eq!(error_code(ack).as_deref(), Some("MATCH_ENDED"));

    let snapshot = state.match_state().lock().await.clone();
    assert_eq!((snapshot.left_score, snapshot.right_score), (8, 0));
    assert!(snapshot.ended.over);
    assert_eq!(snapshot.ended.reason, Some(EndReason::Gap));
    assert_eq!(snapshot.ended.winner, Some(Side::Left));
}

#[tokio::test]
async fn restart_restores_a_stopped_clock() {
    let dir = tempfile::tempdir().unwrap();
    let last_match = dir.path().join("last-match.json");
    let settings = dir.path().join("settings.json");
    std::fs::write(
        &last_match,
        json!({
            "matchId": "2f1c5a8e-6b0a-4a53-9d7a-0c9f3f6f2d11",
            "leftScore": 4,
            "rightScore": 120,
            "senshu": "blue",
            "timer": { "initialMs": 90000, "remainingMs": 45000, "running": true, "lastStartTs": 12 },
            "penalties": { "left": { "C1": 1, "C2": 0 }, "right": { "C1": 0, "C2": 2 } },
            "rules": { "pointGap": 0, "targetScore": null, "penaltyLimit": 5 },
            "ended": { "over": false, "winner": null, "reason": "time" }
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(&settings, json!({ "pin": 1357 }).to_string()).unwrap();

    let store = Arc::new(FileSnapshotStore::new(&last_match, &settings));
    let state = boot(store, Arc::new(ManualClock::new(0))).await;

    let snapshot = state.match_state().lock().await.clone();
    assert!(!snapshot.timer.running);
    assert_eq!(snapshot.timer.last_resume_timestamp, None);
    assert_eq!(snapshot.timer.remaining_ms, 45_000);
    assert_eq!(snapshot.right_score, 99);
    assert_eq!(snapshot.priority_marker, Some(Side::Right));
    assert_eq!(snapshot.rules.point_gap, 1);
    assert!(!snapshot.ended.over);
    assert_eq!(state.settings().lock().await.pin, "1357");

    let controller = connect(&state);
    let ack = send(
        &state,
        controller,
        json!({ "type": "auth:login", "role": "controller", "pin": "1357" }),
    )
    .await;
    assert!(ack.ok);
}

#[tokio::test]
async fn holder_disconnect_frees_the_lock_for_others() {
    let state = boot(
        Arc::new(InMemorySnapshotStore::new()),
        Arc::new(ManualClock::new(0)),
    )
    .await;

    let first = connect(&state);
    let second = connect(&state);
    for session in [first, second] {
        send(
            &state,
            session,
            json!({ "type": "auth:login", "role": "config", "pin": "0000" }),
        )
        .await;
    }
    send(&state, first, json!({ "type": "control:lock:claim" })).await;

    session_service::disconnect(&state, first).await;
    assert_eq!(state.controller().lock().await.holder(), None);

    send(&state, second, json!({ "type": "control:lock:claim" })).await;
    assert!(send(&state, second, json!({ "type": "timer:stop" })).await.ok);
}
