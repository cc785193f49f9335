use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Current holder of the controller lock.
#[derive(Debug, Serialize, ToSchema)]
pub struct LockStatusResponse {
    /// Session holding the lock, `null` when free.
    pub holder: Option<Uuid>,
}
