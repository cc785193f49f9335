use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{sse::ServerEvent, ws::ServerMessage},
    state::SharedState,
};

/// Subscribe to the shared broadcast stream.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerMessage> {
    state.events().subscribe()
}

/// Events sent to a display right after it subscribes.
pub async fn initial_events(state: &SharedState) -> Vec<ServerMessage> {
    let holder = state.controller().lock().await.holder();
    let snapshot = state.match_state().lock().await.clone();
    vec![
        ServerMessage::StateFull { state: snapshot },
        ServerMessage::LockStatus { holder },
    ]
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    initial: Vec<ServerMessage>,
    mut receiver: broadcast::Receiver<ServerMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for message in &initial {
            let Some(event) = to_event(message) else {
                continue;
            };
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(message) => {
                            let Some(event) = to_event(&message) else {
                                continue;
                            };
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        info!("public SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(message: &ServerMessage) -> Option<Event> {
    match ServerEvent::try_from(message) {
        Ok(payload) => {
            let mut event = Event::default().data(payload.data);
            if let Some(name) = payload.event {
                event = event.event(name);
            }
            Some(event)
        }
        Err(err) => {
            warn!(error = %err, "failed to encode SSE event");
            None
        }
    }
}
