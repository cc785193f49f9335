use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::health::HealthResponse, services::health_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/status",
    tag = "health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
/// Report the match outcome and persistence health without side effects.
pub async fn status(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(health_service::health_status(&state).await)
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/status", get(status))
}
