use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Wire protocol version stamped on every snapshot.
pub const WS_VERSION: &str = "1.0.0";
/// Upper bound for scores and rule thresholds.
pub const MAX_SCORE: u32 = 99;
/// Default point gap that ends a match early.
pub const DEFAULT_POINT_GAP: u32 = 8;
/// Default total penalty count that forfeits a match.
pub const DEFAULT_PENALTY_LIMIT: u32 = 5;
/// PIN used when no settings were ever saved.
pub const DEFAULT_PIN: &str = "0000";

/// One of the two competing sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left side (red in the legacy vocabulary).
    #[serde(alias = "red")]
    Left,
    /// Right side (blue in the legacy vocabulary).
    #[serde(alias = "blue")]
    Right,
}

impl Side {
    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Parse a side name, accepting the legacy colour names.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" | "red" => Some(Side::Left),
            "right" | "blue" => Some(Side::Right),
            _ => None,
        }
    }
}

/// Penalty category. `C1` covers minor infringements, `C2` major ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PenaltyCategory {
    /// Minor penalties.
    #[serde(alias = "minor")]
    C1,
    /// Major penalties.
    #[serde(alias = "major")]
    C2,
}

/// Countdown clock of the match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// Configured duration.
    pub initial_ms: u64,
    /// Authoritative time left, always within `0..=initial_ms`.
    pub remaining_ms: u64,
    /// Whether the ticker decrements `remaining_ms`.
    pub running: bool,
    /// Instant the timer was last resumed or ticked, `None` while stopped.
    pub last_resume_timestamp: Option<u64>,
}

impl TimerState {
    /// Stop the countdown and forget the resume instant.
    pub fn halt(&mut self) {
        self.running = false;
        self.last_resume_timestamp = None;
    }
}

/// Penalty counters of a single side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PenaltyCounts {
    /// Minor penalty counter.
    #[serde(rename = "C1")]
    pub c1: u32,
    /// Major penalty counter.
    #[serde(rename = "C2")]
    pub c2: u32,
}

impl PenaltyCounts {
    /// Counter for a category.
    pub fn get(&self, category: PenaltyCategory) -> u32 {
        match category {
            PenaltyCategory::C1 => self.c1,
            PenaltyCategory::C2 => self.c2,
        }
    }

    /// Mutable counter for a category.
    pub fn get_mut(&mut self, category: PenaltyCategory) -> &mut u32 {
        match category {
            PenaltyCategory::C1 => &mut self.c1,
            PenaltyCategory::C2 => &mut self.c2,
        }
    }

    /// Sum of both categories.
    pub fn total(&self) -> u32 {
        self.c1.saturating_add(self.c2)
    }
}

/// Penalty counters for both sides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Penalties {
    /// Left side counters.
    pub left: PenaltyCounts,
    /// Right side counters.
    pub right: PenaltyCounts,
}

impl Penalties {
    /// Counters of `side`.
    pub fn side(&self, side: Side) -> &PenaltyCounts {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Mutable counters of `side`.
    pub fn side_mut(&mut self, side: Side) -> &mut PenaltyCounts {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

/// Per-category display flags. They never affect termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PenaltyVisibility {
    /// Show minor penalties.
    #[serde(rename = "C1")]
    pub c1: bool,
    /// Show major penalties.
    #[serde(rename = "C2")]
    pub c2: bool,
}

impl Default for PenaltyVisibility {
    fn default() -> Self {
        Self { c1: true, c2: true }
    }
}

impl PenaltyVisibility {
    /// Update the flag of `category`.
    pub fn set(&mut self, category: PenaltyCategory, visible: bool) {
        match category {
            PenaltyCategory::C1 => self.c1 = visible,
            PenaltyCategory::C2 => self.c2 = visible,
        }
    }
}

/// Configurable termination thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    /// Score difference that ends the match, in `1..=99`.
    pub point_gap: u32,
    /// Score that wins outright; `None` disables the rule.
    pub target_score: Option<u32>,
    /// Total penalties (C1 + C2) that forfeit the match, in `1..=99`.
    pub penalty_limit: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            point_gap: DEFAULT_POINT_GAP,
            target_score: None,
            penalty_limit: DEFAULT_PENALTY_LIMIT,
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// Point gap reached.
    Gap,
    /// Target score reached.
    Target,
    /// Clock expired.
    Time,
    /// Penalty limit reached.
    Penalty,
}

/// Terminal flag plus its justification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Ended {
    /// Whether the match is over.
    pub over: bool,
    /// Winning side, `None` while open or on a draw.
    pub winner: Option<Side>,
    /// Reason, set whenever `over` is true.
    pub reason: Option<EndReason>,
}

impl Ended {
    /// A finished match.
    pub fn finished(reason: EndReason, winner: Option<Side>) -> Self {
        Self {
            over: true,
            winner,
            reason: Some(reason),
        }
    }
}

/// The single authoritative record of the running match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MatchState {
    /// Wire protocol version.
    pub ws_version: String,
    /// Identifier of the logical match, regenerated on reset.
    pub match_id: Uuid,
    /// Left score, in `0..=99`.
    pub left_score: u32,
    /// Right score, in `0..=99`.
    pub right_score: u32,
    /// Countdown clock.
    pub timer: TimerState,
    /// Side that scored first; breaks a level score at time expiry.
    pub priority_marker: Option<Side>,
    /// Penalty counters.
    pub penalties: Penalties,
    /// Display flags for penalty categories.
    pub penalty_visibility: PenaltyVisibility,
    /// Termination thresholds.
    pub rules: Rules,
    /// Terminal state.
    pub ended: Ended,
}

impl MatchState {
    /// Fresh match using the display defaults from `settings`.
    pub fn new(settings: &Settings) -> Self {
        Self {
            ws_version: WS_VERSION.to_string(),
            match_id: Uuid::new_v4(),
            left_score: 0,
            right_score: 0,
            timer: TimerState::default(),
            priority_marker: None,
            penalties: Penalties::default(),
            penalty_visibility: settings.penalty_visibility,
            rules: Rules::default(),
            ended: Ended::default(),
        }
    }

    /// Score of `side`.
    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left_score,
            Side::Right => self.right_score,
        }
    }

    /// Mutable score of `side`.
    pub fn score_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::Left => &mut self.left_score,
            Side::Right => &mut self.right_score,
        }
    }

    /// Start a new logical match in the same slot, keeping rules and duration.
    pub fn reset_match(&mut self) {
        self.match_id = Uuid::new_v4();
        self.left_score = 0;
        self.right_score = 0;
        self.penalties = Penalties::default();
        self.priority_marker = None;
        self.ended = Ended::default();
        self.timer.remaining_ms = self.timer.initial_ms;
        self.timer.halt();
    }

    /// Reconfigure the clock to `initial_ms` and reopen the match.
    pub fn rearm_timer(&mut self, initial_ms: u64) {
        self.timer.initial_ms = initial_ms;
        self.timer.remaining_ms = initial_ms;
        self.timer.halt();
        self.ended = Ended::default();
    }
}

/// Long-lived settings shared across matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Secret required for controller logins.
    pub pin: String,
    /// Visibility applied to freshly created matches.
    pub penalty_visibility: PenaltyVisibility,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN.to_string(),
            penalty_visibility: PenaltyVisibility::default(),
        }
    }
}

/// Clamp a threshold into `1..=99`.
pub fn clamp_threshold(value: i64) -> u32 {
    value.clamp(1, MAX_SCORE as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_match_uses_settings_visibility() {
        let settings = Settings {
            pin: "1234".into(),
            penalty_visibility: PenaltyVisibility { c1: false, c2: true },
        };
        let state = MatchState::new(&settings);
        assert_eq!(state.penalty_visibility, settings.penalty_visibility);
        assert_eq!(state.rules, Rules::default());
        assert!(!state.ended.over);
        assert_eq!(state.timer, TimerState::default());
    }

    #[test]
    fn reset_keeps_duration_and_rules() {
        let mut state = MatchState::new(&Settings::default());
        state.rearm_timer(90_000);
        state.timer.remaining_ms = 10;
        state.left_score = 4;
        state.penalties.right.c2 = 2;
        state.priority_marker = Some(Side::Left);
        state.rules.point_gap = 3;
        state.ended = Ended::finished(EndReason::Gap, Some(Side::Left));
        let previous = state.match_id;

        state.reset_match();

        assert_ne!(state.match_id, previous);
        assert_eq!(state.left_score, 0);
        assert_eq!(state.penalties, Penalties::default());
        assert_eq!(state.priority_marker, None);
        assert_eq!(state.ended, Ended::default());
        assert_eq!(state.timer.initial_ms, 90_000);
        assert_eq!(state.timer.remaining_ms, 90_000);
        assert_eq!(state.rules.point_gap, 3);
    }

    #[test]
    fn serializes_with_wire_names() {
        let state = MatchState::new(&Settings::default());
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["wsVersion"], WS_VERSION);
        assert_eq!(value["penalties"]["left"]["C1"], 0);
        assert_eq!(value["rules"]["pointGap"], 8);
        assert!(value["rules"]["targetScore"].is_null());
        assert!(value["timer"]["lastResumeTimestamp"].is_null());
        assert!(value["ended"]["reason"].is_null());
    }

    #[test]
    fn legacy_side_names_deserialize() {
        let side: Side = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(side, Side::Left);
        assert_eq!(Side::parse("blue"), Some(Side::Right));
        assert_eq!(Side::parse("green"), None);
    }

    #[test]
    fn thresholds_are_clamped() {
        assert_eq!(clamp_threshold(0), 1);
        assert_eq!(clamp_threshold(-5), 1);
        assert_eq!(clamp_threshold(150), 99);
        assert_eq!(clamp_threshold(12), 12);
    }
}
