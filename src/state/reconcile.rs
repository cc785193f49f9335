//! Migration of persisted records into the current data model.
//!
//! Snapshots written by older builds may miss fields, use legacy names
//! (`senshu`, `red`/`blue`) or carry out-of-range values. Every field is read
//! and validated on its own; anything unusable falls back to the matching
//! default instead of rejecting the whole record.

use serde_json::Value;
use uuid::Uuid;

use crate::state::match_state::{
    EndReason, Ended, MAX_SCORE, MatchState, Penalties, PenaltyCounts, PenaltyVisibility, Rules,
    Settings, Side, TimerState, clamp_threshold,
};

/// Rebuild a [`MatchState`] from an untyped snapshot, substituting `defaults`
/// for every missing or invalid field.
///
/// A reloaded clock always comes back stopped.
pub fn reconcile(raw: &Value, defaults: &MatchState) -> MatchState {
    let initial_ms =
        non_negative(raw.pointer("/timer/initialMs")).unwrap_or(defaults.timer.initial_ms);
    let remaining_ms = non_negative(raw.pointer("/timer/remainingMs"))
        .unwrap_or(defaults.timer.remaining_ms)
        .min(initial_ms);

    let marker = raw
        .get("priorityMarker")
        .or_else(|| raw.get("senshu"))
        .and_then(side);

    MatchState {
        ws_version: raw
            .get("wsVersion")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| defaults.ws_version.clone()),
        match_id: raw
            .get("matchId")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or(defaults.match_id),
        left_score: score(raw.get("leftScore")).unwrap_or(defaults.left_score),
        right_score: score(raw.get("rightScore")).unwrap_or(defaults.right_score),
        timer: TimerState {
            initial_ms,
            remaining_ms,
            running: false,
            last_resume_timestamp: None,
        },
        priority_marker: marker.or(defaults.priority_marker),
        penalties: Penalties {
            left: penalty_counts(raw.pointer("/penalties/left"), &defaults.penalties.left),
            right: penalty_counts(raw.pointer("/penalties/right"), &defaults.penalties.right),
        },
        penalty_visibility: visibility(raw.get("penaltyVisibility"), &defaults.penalty_visibility),
        rules: rules(raw.get("rules"), &defaults.rules),
        ended: ended(raw.get("ended"), &defaults.ended),
    }
}

/// Rebuild [`Settings`] from an untyped record, falling back per field.
pub fn reconcile_settings(raw: &Value) -> Settings {
    let defaults = Settings::default();
    Settings {
        pin: match raw.get("pin") {
            Some(Value::String(pin)) if !pin.is_empty() => pin.clone(),
            Some(Value::Number(pin)) => pin.to_string(),
            _ => defaults.pin,
        },
        penalty_visibility: visibility(raw.get("penaltyVisibility"), &defaults.penalty_visibility),
    }
}

fn non_negative(value: Option<&Value>) -> Option<u64> {
    let number = value?.as_f64()?;
    (number.is_finite() && number >= 0.0).then(|| number.floor() as u64)
}

fn score(value: Option<&Value>) -> Option<u32> {
    non_negative(value).map(|score| score.min(MAX_SCORE as u64) as u32)
}

fn threshold(value: Option<&Value>) -> Option<u32> {
    let number = value?.as_f64()?;
    number.is_finite().then(|| clamp_threshold(number.floor() as i64))
}

fn side(value: &Value) -> Option<Side> {
    value.as_str().and_then(Side::parse)
}

fn penalty_counts(value: Option<&Value>, defaults: &PenaltyCounts) -> PenaltyCounts {
    // Counters beyond u32 are corrupt, not huge.
    let count = |key: &str| {
        non_negative(value.and_then(|v| v.get(key))).and_then(|n| u32::try_from(n).ok())
    };
    PenaltyCounts {
        c1: count("C1").unwrap_or(defaults.c1),
        c2: count("C2").unwrap_or(defaults.c2),
    }
}

fn visibility(value: Option<&Value>, defaults: &PenaltyVisibility) -> PenaltyVisibility {
    let flag = |key: &str| value.and_then(|v| v.get(key)).and_then(Value::as_bool);
    PenaltyVisibility {
        c1: flag("C1").unwrap_or(defaults.c1),
        c2: flag("C2").unwrap_or(defaults.c2),
    }
}

fn rules(value: Option<&Value>, defaults: &Rules) -> Rules {
    let field = |key: &str| value.and_then(|v| v.get(key));
    Rules {
        point_gap: threshold(field("pointGap")).unwrap_or(defaults.point_gap),
        // Anything but a number means the rule is disabled.
        target_score: threshold(field("targetScore")),
        penalty_limit: threshold(field("penaltyLimit")).unwrap_or(defaults.penalty_limit),
    }
}

fn ended(value: Option<&Value>, defaults: &Ended) -> Ended {
    let Some(value) = value else {
        return *defaults;
    };

    let over = value.get("over").and_then(Value::as_bool).unwrap_or(defaults.over);
    if !over {
        return Ended::default();
    }

    let reason = value
        .get("reason")
        .and_then(|reason| serde_json::from_value::<EndReason>(reason.clone()).ok())
        .unwrap_or(EndReason::Time);
    Ended::finished(reason, value.get("winner").and_then(side))
}
