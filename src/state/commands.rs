//! Mutating commands and their pure application against the match record.
//!
//! [`apply`] validates a command and then mutates in place; when it returns an
//! error nothing has been touched. Persistence, termination checks and
//! broadcasting are the dispatcher's job.

use thiserror::Error;
use uuid::Uuid;

use crate::state::match_state::{
    MAX_SCORE, MatchState, PenaltyCategory, PenaltyVisibility, Settings, Side, clamp_threshold,
};

/// Penalty corrections accepted by `addPenalty`.
pub const PENALTY_DELTAS: [i32; 2] = [-1, 1];

/// Partial rules update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesUpdate {
    /// New point gap.
    pub point_gap: Option<i64>,
    /// `Some(None)` disables the target score.
    pub target_score: Option<Option<i64>>,
    /// New penalty limit.
    pub penalty_limit: Option<i64>,
}

/// Bulk configuration saved from the settings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUpdate {
    /// New match duration.
    pub duration_ms: u64,
    /// Point gap, current value kept when absent.
    pub point_gap: Option<i64>,
    /// Target score, disabled when absent.
    pub target_score: Option<i64>,
    /// Penalty limit, current value kept when absent.
    pub penalty_limit: Option<i64>,
    /// Display flags, also stored as the settings default.
    pub penalty_visibility: PenaltyVisibility,
    /// New controller PIN, current one kept when absent.
    pub pin: Option<String>,
}

/// State-mutating commands issued by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Configure the clock and reopen the match.
    SetTimer {
        /// New duration.
        initial_ms: u64,
    },
    /// Give time back, capped at the configured duration.
    AddTime {
        /// Time to add.
        ms: u64,
    },
    /// Resume the countdown.
    Start,
    /// Pause the countdown.
    Stop,
    /// Start a new logical match.
    Reset,
    /// Adjust a score.
    AddScore {
        /// Side to adjust.
        side: Side,
        /// Signed correction; the result is clamped to the score range.
        delta: i32,
    },
    /// Adjust a penalty counter.
    AddPenalty {
        /// Side to adjust.
        side: Side,
        /// Counter to adjust.
        category: PenaltyCategory,
        /// One of [`PENALTY_DELTAS`].
        delta: i32,
    },
    /// Set or clear the priority marker.
    SetMarker {
        /// New marker.
        side: Option<Side>,
    },
    /// Update termination thresholds.
    SetRules(RulesUpdate),
    /// Toggle a display flag.
    SetPenaltyVisibility {
        /// Category to toggle.
        category: PenaltyCategory,
        /// New flag.
        visible: bool,
    },
    /// Save the whole configuration at once.
    SaveConfig(ConfigUpdate),
}

impl Command {
    /// Wire name of the command, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetTimer { .. } => "timer:set",
            Command::AddTime { .. } => "timer:add",
            Command::Start => "timer:start",
            Command::Stop => "timer:stop",
            Command::Reset => "timer:reset",
            Command::AddScore { .. } => "score:add",
            Command::AddPenalty { .. } => "penalty:add",
            Command::SetMarker { .. } => "marker:set",
            Command::SetRules(_) => "rules:set",
            Command::SetPenaltyVisibility { .. } => "penaltyVisibility:set",
            Command::SaveConfig(_) => "config:save",
        }
    }

    /// Commands that may run against a finished match to start it over.
    pub fn reopens_match(&self) -> bool {
        matches!(
            self,
            Command::SetTimer { .. } | Command::Reset | Command::SaveConfig(_)
        )
    }

    /// Commands after which the termination policy has to run.
    pub fn affects_outcome(&self) -> bool {
        matches!(
            self,
            Command::AddScore { .. }
                | Command::AddPenalty { .. }
                | Command::SetMarker { .. }
                | Command::SetRules(_)
                | Command::SetPenaltyVisibility { .. }
        )
    }
}

/// Reasons a command is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The match is over and the command cannot reopen it.
    #[error("match has ended")]
    MatchEnded,
    /// The command payload is outside its domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// What a successful command changed beyond the match record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Only the match record changed.
    Applied,
    /// A new logical match started.
    Reset {
        /// Identifier of the new match.
        match_id: Uuid,
    },
    /// The settings record changed as well.
    SettingsChanged,
}

/// Validate and apply `command`, leaving both records untouched on error.
pub fn apply(
    state: &mut MatchState,
    settings: &mut Settings,
    command: Command,
    now_ms: u64,
) -> Result<CommandOutcome, CommandError> {
    if state.ended.over && !command.reopens_match() {
        return Err(CommandError::MatchEnded);
    }

    match command {
        Command::SetTimer { initial_ms } => {
            state.rearm_timer(initial_ms);
        }
        Command::AddTime { ms } => {
            state.timer.remaining_ms = state
                .timer
                .remaining_ms
                .saturating_add(ms)
                .min(state.timer.initial_ms);
        }
        Command::Start => {
            if !state.timer.running {
                state.timer.running = true;
                state.timer.last_resume_timestamp = Some(now_ms);
            }
        }
        Command::Stop => {
            state.timer.halt();
        }
        Command::Reset => {
            state.reset_match();
            return Ok(CommandOutcome::Reset {
                match_id: state.match_id,
            });
        }
        Command::AddScore { side, delta } => {
            let score = state.score_mut(side);
            *score = (*score as i64 + delta as i64).clamp(0, MAX_SCORE as i64) as u32;
            if state.priority_marker.is_none() && delta > 0 {
                state.priority_marker = Some(side);
            }
        }
        Command::AddPenalty {
            side,
            category,
            delta,
        } => {
            if !PENALTY_DELTAS.contains(&delta) {
                return Err(CommandError::InvalidInput(format!(
                    "penalty delta {delta} is not one of {PENALTY_DELTAS:?}"
                )));
            }
            let counter = state.penalties.side_mut(side).get_mut(category);
            *counter = counter.saturating_add_signed(delta);
        }
        Command::SetMarker { side } => {
            state.priority_marker = side;
        }
        Command::SetRules(update) => {
            if let Some(point_gap) = update.point_gap {
                state.rules.point_gap = clamp_threshold(point_gap);
            }
            if let Some(target_score) = update.target_score {
                state.rules.target_score = target_score.map(clamp_threshold);
            }
            if let Some(penalty_limit) = update.penalty_limit {
                state.rules.penalty_limit = clamp_threshold(penalty_limit);
            }
        }
        Command::SetPenaltyVisibility { category, visible } => {
            state.penalty_visibility.set(category, visible);
        }
        Command::SaveConfig(config) => {
            if config.pin.as_deref().is_some_and(|pin| pin.trim().is_empty()) {
                return Err(CommandError::InvalidInput("pin must not be empty".into()));
            }

            state.rearm_timer(config.duration_ms);
            let rules = &mut state.rules;
            rules.point_gap = clamp_threshold(config.point_gap.unwrap_or(rules.point_gap as i64));
            rules.target_score = config.target_score.map(clamp_threshold);
            rules.penalty_limit =
                clamp_threshold(config.penalty_limit.unwrap_or(rules.penalty_limit as i64));
            state.penalty_visibility = config.penalty_visibility;

            if let Some(pin) = config.pin {
                settings.pin = pin;
            }
            settings.penalty_visibility = config.penalty_visibility;
            return Ok(CommandOutcome::SettingsChanged);
        }
    }

    Ok(CommandOutcome::Applied)
}
