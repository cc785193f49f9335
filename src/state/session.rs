use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Identifier assigned to every connected session.
pub type SessionId = Uuid;

/// Privilege level requested at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only viewer; never allowed to hold the controller lock.
    #[serde(alias = "display")]
    Observer,
    /// Candidate for the controller lock, authenticated by PIN.
    #[serde(alias = "control", alias = "config")]
    Controller,
}

/// Login status of a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Role granted by the last successful login.
    pub role: Role,
    /// Whether a login has succeeded on this session.
    pub authenticated: bool,
}

impl Session {
    /// Freshly connected, not yet logged in.
    pub fn connected(id: SessionId) -> Self {
        Self {
            id,
            role: Role::Observer,
            authenticated: false,
        }
    }

    /// Whether the session may compete for the controller lock.
    pub fn can_control(&self) -> bool {
        self.authenticated && self.role == Role::Controller
    }
}
