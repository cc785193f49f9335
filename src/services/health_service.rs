use crate::{dto::health::HealthResponse, state::SharedState};

/// Read-only status of the match and of snapshot persistence.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let (version, ended) = {
        let match_state = state.match_state().lock().await;
        (match_state.ws_version.clone(), match_state.ended)
    };
    HealthResponse::new(version, ended, state.is_degraded())
}
