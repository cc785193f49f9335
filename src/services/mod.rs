/// Fan-out helpers for match and lock events.
pub mod broadcast;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Command dispatcher, countdown tick and lock sweep.
pub mod match_service;
/// Background writer for match and settings snapshots.
pub mod persistence;
/// Login and controller-lock handling for sessions.
pub mod session_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Periodic background tasks.
pub mod ticker;
/// WebSocket connection and message handling service.
pub mod websocket_service;

#[cfg(test)]
pub(crate) mod testing;
