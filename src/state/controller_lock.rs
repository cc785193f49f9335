use std::collections::HashMap;

use thiserror::Error;

use crate::state::session::{Session, SessionId};

/// Errors raised by lock operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockError {
    /// Session is not logged in as a controller.
    #[error("session is not allowed to hold the controller lock")]
    NotAuthorized,
}

/// Observable effect of a lock operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockChange {
    /// Nothing changed.
    Unchanged,
    /// Holder changed to the carried value.
    Holder(Option<SessionId>),
}

/// Reassignable single-writer lease with heartbeat-based expiry.
#[derive(Debug, Clone)]
pub struct ControllerLock {
    holder: Option<SessionId>,
    heartbeats: HashMap<SessionId, u64>,
    stale_after_ms: u64,
}

impl ControllerLock {
    /// Create an empty lock that expires holders silent for more than `stale_after_ms`.
    pub fn new(stale_after_ms: u64) -> Self {
        Self {
            holder: None,
            heartbeats: HashMap::new(),
            stale_after_ms,
        }
    }

    /// Current holder, if any.
    pub fn holder(&self) -> Option<SessionId> {
        self.holder
    }

    /// Take over the lock, replacing any previous holder.
    pub fn claim(&mut self, session: &Session, now_ms: u64) -> Result<LockChange, LockError> {
        if !session.can_control() {
            return Err(LockError::NotAuthorized);
        }

        if let Some(previous) = self.holder.filter(|previous| *previous != session.id) {
            self.heartbeats.remove(&previous);
        }
        self.holder = Some(session.id);
        self.heartbeats.insert(session.id, now_ms);
        Ok(LockChange::Holder(self.holder))
    }

    /// Give the lock up. Releasing a lock held by someone else is a no-op.
    pub fn release(&mut self, session_id: SessionId) -> LockChange {
        if self.holder != Some(session_id) {
            return LockChange::Unchanged;
        }
        self.holder = None;
        self.heartbeats.remove(&session_id);
        LockChange::Holder(None)
    }

    /// Refresh liveness; ignored unless `session_id` holds the lock.
    pub fn heartbeat(&mut self, session_id: SessionId, now_ms: u64) -> bool {
        if self.holder != Some(session_id) {
            return false;
        }
        self.heartbeats.insert(session_id, now_ms);
        true
    }

    /// Force-release a holder whose last heartbeat is missing or stale.
    pub fn sweep(&mut self, now_ms: u64) -> LockChange {
        let Some(holder) = self.holder else {
            return LockChange::Unchanged;
        };

        let stale = match self.heartbeats.get(&holder) {
            Some(last) => now_ms.saturating_sub(*last) > self.stale_after_ms,
            None => true,
        };

        if stale {
            self.release(holder)
        } else {
            LockChange::Unchanged
        }
    }

    /// Whether `session` may issue mutating commands right now.
    pub fn is_authorized(&self, session: &Session) -> bool {
        session.can_control() && self.holder == Some(session.id)
    }
}
