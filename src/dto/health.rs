use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::format_system_time, state::match_state::Ended};

/// Read-only status returned by the `/status` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always true when the server answers.
    pub ok: bool,
    /// Wire protocol version of the match snapshots.
    pub version: String,
    /// Terminal state of the current match.
    pub ended: Ended,
    /// True when the last snapshot save failed.
    pub degraded: bool,
    /// Server wall-clock time (RFC 3339).
    pub server_time: String,
}

impl HealthResponse {
    /// Build a status payload for the given match outcome.
    pub fn new(version: impl Into<String>, ended: Ended, degraded: bool) -> Self {
        Self {
            ok: true,
            version: version.into(),
            ended,
            degraded,
            server_time: format_system_time(SystemTime::now()),
        }
    }
}
