//! Ordered match-termination policy.
//!
//! Rules are checked in a fixed priority (penalty limit, point gap, target
//! score, time expiry) and the first one satisfied decides the outcome.

use crate::state::match_state::{Ended, EndReason, MatchState, Side};

/// Outcome of a satisfied termination rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Rule that fired.
    pub reason: EndReason,
    /// Winning side, `None` on a draw.
    pub winner: Option<Side>,
}

/// Decide whether `state` has reached a terminal condition.
///
/// Returns `None` when the match is already over or no rule applies.
pub fn evaluate(state: &MatchState) -> Option<Verdict> {
    if state.ended.over {
        return None;
    }

    penalty_limit(state)
        .or_else(|| point_gap(state))
        .or_else(|| target_score(state))
        .or_else(|| time_expiry(state))
}

/// Evaluate `state` and, on a verdict, close the match and stop the clock.
pub fn conclude(state: &mut MatchState) -> Option<Verdict> {
    let verdict = evaluate(state)?;
    state.ended = Ended::finished(verdict.reason, verdict.winner);
    state.timer.halt();
    Some(verdict)
}

fn penalty_limit(state: &MatchState) -> Option<Verdict> {
    let limit = state.rules.penalty_limit.max(1);
    [Side::Left, Side::Right]
        .into_iter()
        .find(|side| state.penalties.side(*side).total() >= limit)
        .map(|offender| Verdict {
            reason: EndReason::Penalty,
            winner: Some(offender.other()),
        })
}

fn point_gap(state: &MatchState) -> Option<Verdict> {
    let gap = state.rules.point_gap;
    if gap == 0 || state.left_score.abs_diff(state.right_score) < gap {
        return None;
    }
    Some(Verdict {
        reason: EndReason::Gap,
        winner: leader(state),
    })
}

fn target_score(state: &MatchState) -> Option<Verdict> {
    let target = state.rules.target_score.filter(|target| *target > 0)?;
    [Side::Left, Side::Right]
        .into_iter()
        .find(|side| state.score(*side) >= target)
        .map(|side| Verdict {
            reason: EndReason::Target,
            winner: Some(side),
        })
}

fn time_expiry(state: &MatchState) -> Option<Verdict> {
    if state.timer.remaining_ms > 0 {
        return None;
    }
    Some(Verdict {
        reason: EndReason::Time,
        winner: leader(state).or(state.priority_marker),
    })
}

fn leader(state: &MatchState) -> Option<Side> {
    match state.left_score.cmp(&state.right_score) {
        std::cmp::Ordering::Greater => Some(Side::Left),
        std::cmp::Ordering::Less => Some(Side::Right),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::match_state::Settings;

    fn open_match() -> MatchState {
        let mut state = MatchState::new(&Settings::default());
        state.rearm_timer(120_000);
        state
    }

    #[test]
    fn open_match_has_no_verdict() {
        let state = open_match();
        assert_eq!(evaluate(&state), None);
    }

    #[test]
    fn penalty_beats_point_gap() {
        let mut state = open_match();
        state.penalties.left.c1 = 3;
        state.penalties.left.c2 = 2;
        state.left_score = 10;
        state.right_score = 0;

        let verdict = evaluate(&state).unwrap();
        assert_eq!(verdict.reason, EndReason::Penalty);
        assert_eq!(verdict.winner, Some(Side::Right));
    }

    #[test]
    fn right_penalties_hand_win_to_left() {
        let mut state = open_match();
        state.penalties.right.c2 = 5;
        let verdict = evaluate(&state).unwrap();
        assert_eq!(verdict, Verdict { reason: EndReason::Penalty, winner: Some(Side::Left) });
    }

    #[test]
    fn point_gap_awards_leader() {
        let mut state = open_match();
        state.right_score = 9;
        state.left_score = 1;
        let verdict = evaluate(&state).unwrap();
        assert_eq!(verdict, Verdict { reason: EndReason::Gap, winner: Some(Side::Right) });
    }

    #[test]
    fn target_prefers_left_when_both_qualify() {
        let mut state = open_match();
        state.rules.point_gap = 99;
        state.rules.target_score = Some(5);
        state.left_score = 5;
        state.right_score = 6;
        let verdict = evaluate(&state).unwrap();
        assert_eq!(verdict, Verdict { reason: EndReason::Target, winner: Some(Side::Left) });
    }

    #[test]
    fn disabled_target_is_ignored() {
        let mut state = open_match();
        state.rules.target_score = None;
        state.left_score = 7;
        assert_eq!(evaluate(&state), None);
    }

    #[test]
    fn time_expiry_uses_marker_on_level_score() {
        let mut state = open_match();
        state.left_score = 2;
        state.right_score = 2;
        state.priority_marker = Some(Side::Left);
        state.timer.remaining_ms = 0;
        let verdict = evaluate(&state).unwrap();
        assert_eq!(verdict, Verdict { reason: EndReason::Time, winner: Some(Side::Left) });
    }

    #[test]
    fn time_expiry_without_marker_is_a_draw() {
        let mut state = open_match();
        state.timer.remaining_ms = 0;
        let verdict = evaluate(&state).unwrap();
        assert_eq!(verdict, Verdict { reason: EndReason::Time, winner: None });
    }

    #[test]
    fn time_expiry_ignores_marker_when_scores_differ() {
        let mut state = open_match();
        state.right_score = 3;
        state.left_score = 1;
        state.priority_marker = Some(Side::Left);
        state.timer.remaining_ms = 0;
        assert_eq!(evaluate(&state).unwrap().winner, Some(Side::Right));
    }

    #[test]
    fn conclude_stops_the_clock_once() {
        let mut state = open_match();
        state.timer.running = true;
        state.timer.last_resume_timestamp = Some(10);
        state.left_score = 8;

        let verdict = conclude(&mut state).unwrap();
        assert_eq!(verdict.reason, EndReason::Gap);
        assert!(state.ended.over);
        assert_eq!(state.ended.winner, Some(Side::Left));
        assert!(!state.timer.running);

        assert_eq!(conclude(&mut state), None);
    }
}
