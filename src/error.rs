use thiserror::Error;

use crate::{
    dto::ws::{Ack, FrameError},
    state::{commands::CommandError, controller_lock::LockError},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Controller login with a wrong PIN.
    #[error("bad credential")]
    BadCredential,
    /// Session does not hold the controller lock.
    #[error("session is not the controller")]
    NotController,
    /// Session may not compete for the controller lock.
    #[error("session is not authorized to control")]
    NotAuthorized,
    /// The match is over.
    #[error("match has ended")]
    MatchEnded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Stable wire code sent in failed acks.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadCredential => "AUTH_BAD_PIN",
            ServiceError::NotController => "NOT_CONTROLLER",
            ServiceError::NotAuthorized => "NOT_AUTHORIZED",
            ServiceError::MatchEnded => "MATCH_ENDED",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            ServiceError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<ServiceError> for Ack {
    fn from(err: ServiceError) -> Self {
        Ack::error(err.code(), err.to_string())
    }
}

impl From<CommandError> for ServiceError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::MatchEnded => ServiceError::MatchEnded,
            CommandError::InvalidInput(message) => ServiceError::InvalidInput(message),
        }
    }
}

impl From<LockError> for ServiceError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::NotAuthorized => ServiceError::NotAuthorized,
        }
    }
}

impl From<FrameError> for ServiceError {
    fn from(err: FrameError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(ServiceError::BadCredential.code(), "AUTH_BAD_PIN");
        assert_eq!(ServiceError::NotController.code(), "NOT_CONTROLLER");
        assert_eq!(ServiceError::from(LockError::NotAuthorized).code(), "NOT_AUTHORIZED");
        assert_eq!(ServiceError::from(CommandError::MatchEnded).code(), "MATCH_ENDED");
        assert_eq!(
            ServiceError::from(CommandError::InvalidInput("x".into())).code(),
            "INVALID_INPUT"
        );
    }

    #[test]
    fn failed_ack_carries_code() {
        let ack = Ack::from(ServiceError::NotController);
        assert!(!ack.ok);
        assert_eq!(ack.error.map(|e| e.code), Some("NOT_CONTROLLER".to_string()));
    }
}
