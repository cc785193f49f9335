use tracing::info;

use crate::{
    dto::ws::ServerMessage,
    state::{SharedState, match_state::MatchState, session::SessionId, termination::Verdict},
};

/// Push the complete match snapshot to every subscriber.
pub fn broadcast_full(state: &SharedState, snapshot: &MatchState) {
    state.events().broadcast(ServerMessage::StateFull {
        state: snapshot.clone(),
    });
}

/// Announce that the match just ended.
pub fn broadcast_ended(state: &SharedState, verdict: Verdict) {
    info!(
        reason = ?verdict.reason,
        winner = ?verdict.winner,
        "match ended"
    );
    state.events().broadcast(ServerMessage::Ended {
        reason: verdict.reason,
        winner: verdict.winner,
    });
}

/// Announce the new controller lock holder.
pub fn broadcast_lock_status(state: &SharedState, holder: Option<SessionId>) {
    state
        .events()
        .broadcast(ServerMessage::LockStatus { holder });
}

/// Tell a single session it now holds the controller lock.
pub fn notify_lock_granted(state: &SharedState, holder: SessionId) {
    state.send_to(holder, ServerMessage::LockGranted { holder });
}
