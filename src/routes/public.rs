use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::public::LockStatusResponse,
    state::{SharedState, match_state::MatchState},
};

#[utoipa::path(
    get,
    path = "/public/match",
    tag = "public",
    responses((status = 200, description = "Current match snapshot", body = MatchState))
)]
/// Return the current match record.
pub async fn current_match(State(state): State<SharedState>) -> Json<MatchState> {
    Json(state.match_state().lock().await.clone())
}

#[utoipa::path(
    get,
    path = "/public/lock",
    tag = "public",
    responses((status = 200, description = "Current controller", body = LockStatusResponse))
)]
/// Return the session currently holding the controller lock.
pub async fn lock_status(State(state): State<SharedState>) -> Json<LockStatusResponse> {
    let holder = state.controller().lock().await.holder();
    Json(LockStatusResponse { holder })
}

/// Configure the read-only public routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/public/match", get(current_match))
        .route("/public/lock", get(lock_status))
}
