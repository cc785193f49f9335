use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Path the raw OpenAPI document is served under.
pub const OPENAPI_JSON_PATH: &str = "/docs/openapi.json";

/// Swagger UI for the scoreboard HTTP and WebSocket surface.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new("/docs")
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into()
}
