use crate::state::match_state::MatchState;

/// Advance a running clock by the wall time elapsed since its last resume.
///
/// Returns whether anything changed.
pub fn advance(state: &mut MatchState, now_ms: u64) -> bool {
    if !state.timer.running {
        return false;
    }

    let since = state.timer.last_resume_timestamp.unwrap_or(now_ms);
    let elapsed = now_ms.saturating_sub(since);
    state.timer.last_resume_timestamp = Some(now_ms);
    state.timer.remaining_ms = state.timer.remaining_ms.saturating_sub(elapsed);
    true
}
