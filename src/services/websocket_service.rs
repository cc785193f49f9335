use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{Ack, ClientEnvelope, ClientMessage, ServerMessage},
    error::ServiceError,
    services::{match_service, session_service},
    state::{SharedState, session::SessionId},
};

/// Handle the full lifecycle of a scoreboard WebSocket session.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let payload = match serde_json::to_string(&message) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(error = %err, "failed to serialize outbound message");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let session_id = session_service::connect(&state, outbound_tx.clone());
    let forward_task = spawn_forwarder(&state, session_id, outbound_tx.clone());
    send_initial_snapshot(&state, &outbound_tx).await;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(session = %session_id, payload = %text.as_str(), "received frame");
                let Some(ack) = handle_frame(&state, session_id, text.as_str()).await else {
                    continue;
                };
                if outbound_tx.send(ServerMessage::Ack(ack)).is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(session = %session_id, "session closed by peer");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
            Err(err) => {
                warn!(session = %session_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forward_task.abort();
    session_service::disconnect(&state, session_id).await;
    finalize(writer_task, outbound_tx).await;
}

/// Decode one text frame and run it, returning the ack to send back.
///
/// Heartbeats are only acknowledged when they carry a correlation id.
pub async fn handle_frame(state: &SharedState, session_id: SessionId, text: &str) -> Option<Ack> {
    let envelope = match ClientEnvelope::from_json_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(session = %session_id, error = %err, "rejected inbound frame");
            let ack = Ack::from(ServiceError::from(err));
            return Some(ack.with_id(correlation_id(text)));
        }
    };

    let ClientEnvelope { id, message } = envelope;
    let result = match message {
        ClientMessage::Login(request) => session_service::login(state, session_id, request).await,
        ClientMessage::ClaimLock => session_service::claim(state, session_id).await,
        ClientMessage::ReleaseLock => Ok(session_service::release(state, session_id).await),
        ClientMessage::Ping => {
            session_service::ping(state, session_id).await;
            return id.map(|id| Ack::ok().with_id(Some(id)));
        }
        command => match command.into_command() {
            Some(command) => match_service::execute(state, session_id, command).await,
            None => Err(ServiceError::InvalidInput("unsupported message".into())),
        },
    };

    if let Err(err) = &result {
        debug!(session = %session_id, code = err.code(), "request refused");
    }
    Some(result.unwrap_or_else(Ack::from).with_id(id))
}

/// Relay broadcast events to this session's writer.
fn spawn_forwarder(
    state: &SharedState,
    session_id: SessionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
) -> JoinHandle<()> {
    let mut events = state.events().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) => {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session = %session_id, skipped, "session lagged behind broadcasts");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn send_initial_snapshot(state: &SharedState, tx: &mpsc::UnboundedSender<ServerMessage>) {
    let holder = state.controller().lock().await.holder();
    let snapshot = state.match_state().lock().await.clone();
    let _ = tx.send(ServerMessage::StateFull { state: snapshot });
    let _ = tx.send(ServerMessage::LockStatus { holder });
}

fn correlation_id(text: &str) -> Option<u64> {
    serde_json::from_str::<Value>(text)
        .ok()?
        .get("id")?
        .as_u64()
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<ServerMessage>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::services::testing::{Harness, TEST_PIN};

    async fn send(harness: &Harness, session: SessionId, frame: Value) -> Option<Ack> {
        handle_frame(&harness.state, session, &frame.to_string()).await
    }

    #[tokio::test]
    async fn malformed_frame_is_answered_with_its_id() {
        let harness = Harness::new();
        let (session, _rx) = harness.connect();

        let ack = send(&harness, session, json!({ "type": "score:add", "id": 3, "delta": 9 }))
            .await
            .unwrap();

        assert_eq!(ack.id, Some(3));
        assert_eq!(ack.error.unwrap().code, "INVALID_INPUT");
    }

    #[tokio::test]
    async fn full_session_over_frames() {
        let harness = Harness::new();
        let (session, _rx) = harness.connect();

        let ack = send(
            &harness,
            session,
            json!({ "type": "auth:login", "id": 1, "role": "controller", "pin": TEST_PIN }),
        )
        .await
        .unwrap();
        assert_eq!(ack.session_id, Some(session));
        assert_eq!(ack.controller, Some(false));

        let ack = send(&harness, session, json!({ "type": "timer:start", "id": 2 }))
            .await
            .unwrap();
        assert_eq!(ack.error.unwrap().code, "NOT_CONTROLLER");

        let ack = send(&harness, session, json!({ "type": "control:lock:claim", "id": 3 }))
            .await
            .unwrap();
        assert!(ack.ok);

        let ack = send(&harness, session, json!({ "type": "timer:reset", "id": 4 }))
            .await
            .unwrap();
        assert_eq!(ack.id, Some(4));
        assert_eq!(ack.match_id, Some(harness.snapshot().await.match_id));
    }

    #[tokio::test]
    async fn bad_pin_maps_to_wire_code() {
        let harness = Harness::new();
        let (session, _rx) = harness.connect();
        let ack = send(
            &harness,
            session,
            json!({ "type": "auth:login", "role": "control", "pin": "nope" }),
        )
        .await
        .unwrap();
        assert_eq!(ack.error.unwrap().code, "AUTH_BAD_PIN");
    }

    #[tokio::test]
    async fn heartbeats_without_id_are_silent() {
        let harness = Harness::new();
        let holder = harness.controller().await;
        assert!(send(&harness, holder, json!({ "type": "hb:ping", "t": 1 })).await.is_none());
        let ack = send(&harness, holder, json!({ "type": "hb:ping", "id": 9 })).await.unwrap();
        assert_eq!(ack.id, Some(9));
    }
}
