//! Command dispatcher and periodic match maintenance.
//!
//! Every commit follows the same tail: evaluate termination when the command
//! can change the outcome, queue the snapshot for saving, then broadcast. The
//! match mutex is held for the whole sequence so no partial mutation is ever
//! observable; nothing in it waits on the store.

use tracing::{debug, info};

use crate::{
    dto::ws::Ack,
    error::ServiceError,
    services::broadcast,
    state::{
        SharedState,
        commands::{self, Command, CommandOutcome},
        controller_lock::LockChange,
        countdown,
        session::SessionId,
        termination,
    },
};

/// Authorize and apply a controller command on behalf of `session_id`.
pub async fn execute(
    state: &SharedState,
    session_id: SessionId,
    command: Command,
) -> Result<Ack, ServiceError> {
    let session = state
        .session(session_id)
        .ok_or(ServiceError::NotController)?;

    let controller = state.controller().lock().await;
    if !controller.is_authorized(&session) {
        debug!(session = %session_id, command = command.name(), "command from non-controller");
        return Err(ServiceError::NotController);
    }
    let mut match_state = state.match_state().lock().await;
    drop(controller);

    let name = command.name();
    let evaluates = command.affects_outcome();
    let now = state.now_ms();

    let mut settings = state.settings().lock().await;
    let outcome = commands::apply(&mut match_state, &mut settings, command, now)?;
    let verdict = if evaluates {
        termination::conclude(&mut match_state)
    } else {
        None
    };

    if outcome == CommandOutcome::SettingsChanged {
        state.queue_settings_save(&settings);
    }
    drop(settings);
    state.queue_match_save(&match_state);

    broadcast::broadcast_full(state, &match_state);
    if let Some(verdict) = verdict {
        broadcast::broadcast_ended(state, verdict);
    }
    debug!(session = %session_id, command = name, "command applied");

    Ok(match outcome {
        CommandOutcome::Reset { match_id } => {
            info!(%match_id, "new match started");
            Ack {
                match_id: Some(match_id),
                ..Ack::ok()
            }
        }
        CommandOutcome::Applied | CommandOutcome::SettingsChanged => Ack::ok(),
    })
}

/// Advance a running clock to the current instant, ending the match on expiry.
///
/// Returns whether the match record changed.
pub async fn tick(state: &SharedState) -> bool {
    let mut match_state = state.match_state().lock().await;
    if !countdown::advance(&mut match_state, state.now_ms()) {
        return false;
    }
    let verdict = termination::conclude(&mut match_state);

    state.queue_match_save(&match_state);
    broadcast::broadcast_full(state, &match_state);
    if let Some(verdict) = verdict {
        broadcast::broadcast_ended(state, verdict);
    }
    true
}

/// Reclaim the controller lock from a holder that stopped sending heartbeats.
pub async fn sweep_lock(state: &SharedState) {
    let change = state.controller().lock().await.sweep(state.now_ms());
    if let LockChange::Holder(holder) = change {
        info!("controller heartbeat went stale; lock released");
        broadcast::broadcast_lock_status(state, holder);
    }
}
