use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod public;
pub mod sse;
pub mod websocket;

/// Compose every route tree and bind the shared match state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(public::router())
        .merge(sse::router())
        .merge(websocket::router())
        .merge(docs::router())
        .with_state(state)
}
