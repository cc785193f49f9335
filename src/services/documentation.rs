use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Scoreboard Back.
#[openapi(
    paths(
        crate::routes::health::status,
        crate::routes::public::current_match,
        crate::routes::public::lock_status,
        crate::routes::sse::public_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::public::LockStatusResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::Ack,
            crate::state::match_state::MatchState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only match information"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "sessions", description = "WebSocket sessions for displays and controllers"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/status", "/public/match", "/public/lock", "/sse/public", "/ws"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn session_ids_are_documented_as_uuid_strings() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let ack = &doc["components"]["schemas"]["Ack"]["properties"]["sessionId"];
        assert_eq!(ack["format"], "uuid");
        assert!(doc["components"]["schemas"]["ServerMessage"].is_object());
    }
}
