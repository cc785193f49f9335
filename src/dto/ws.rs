//! JSON frames exchanged over the `/ws` session socket.
//!
//! Every inbound frame is an object tagged by `type` carrying an optional
//! numeric `id`; the server answers each request frame with an [`Ack`] echoing
//! that id. Broadcasts ([`ServerMessage`]) carry no id.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{floor_ms, floor_threshold, validate_finite, validate_penalty_delta},
    state::{
        commands::{Command, ConfigUpdate, RulesUpdate},
        match_state::{EndReason, MatchState, PenaltyCategory, PenaltyVisibility, Side},
        session::Role,
    },
};

/// Errors raised while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Not JSON, or not a known message shape.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but outside the accepted domain.
    #[error("invalid frame: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Inbound frame: a request plus the correlation id echoed in its ack.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    /// Correlation id chosen by the client.
    #[serde(default)]
    pub id: Option<u64>,
    /// The request itself.
    #[serde(flatten)]
    pub message: ClientMessage,
}

impl ClientEnvelope {
    /// Decode and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, FrameError> {
        let envelope: Self = serde_json::from_str(text)?;
        envelope.message.validate()?;
        Ok(envelope)
    }
}

/// Requests accepted from WebSocket sessions.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Authenticate the session.
    #[serde(rename = "auth:login")]
    Login(LoginRequest),
    /// Take over the controller lock.
    #[serde(rename = "control:lock:claim")]
    ClaimLock,
    /// Give up the controller lock.
    #[serde(rename = "control:lock:release")]
    ReleaseLock,
    /// Liveness signal from the lock holder.
    #[serde(rename = "hb:ping")]
    Ping,
    /// Configure the clock.
    #[serde(rename = "timer:set")]
    SetTimer(SetTimerRequest),
    /// Give time back.
    #[serde(rename = "timer:add")]
    AddTime(AddTimeRequest),
    /// Resume the countdown.
    #[serde(rename = "timer:start")]
    StartTimer,
    /// Pause the countdown.
    #[serde(rename = "timer:stop")]
    StopTimer,
    /// Start a new logical match.
    #[serde(rename = "timer:reset")]
    ResetMatch,
    /// Adjust a score.
    #[serde(rename = "score:add")]
    AddScore(AddScoreRequest),
    /// Adjust a penalty counter.
    #[serde(rename = "penalty:add")]
    AddPenalty(AddPenaltyRequest),
    /// Set or clear the priority marker.
    #[serde(rename = "marker:set", alias = "senshu:set")]
    SetMarker(SetMarkerRequest),
    /// Update termination thresholds.
    #[serde(rename = "rules:set")]
    SetRules(SetRulesRequest),
    /// Toggle a penalty display flag.
    #[serde(rename = "penaltyVisibility:set")]
    SetPenaltyVisibility(SetPenaltyVisibilityRequest),
    /// Save the whole configuration.
    #[serde(rename = "config:save")]
    SaveConfig(SaveConfigRequest),
}

impl ClientMessage {
    /// The match command carried by this message, `None` for session-level requests.
    pub fn into_command(self) -> Option<Command> {
        let command = match self {
            ClientMessage::Login(_)
            | ClientMessage::ClaimLock
            | ClientMessage::ReleaseLock
            | ClientMessage::Ping => return None,
            ClientMessage::SetTimer(req) => Command::SetTimer {
                initial_ms: floor_ms(req.initial_ms),
            },
            ClientMessage::AddTime(req) => Command::AddTime {
                ms: req.ms.map(floor_ms).unwrap_or_default(),
            },
            ClientMessage::StartTimer => Command::Start,
            ClientMessage::StopTimer => Command::Stop,
            ClientMessage::ResetMatch => Command::Reset,
            ClientMessage::AddScore(req) => Command::AddScore {
                side: req.side,
                delta: req.delta,
            },
            ClientMessage::AddPenalty(req) => Command::AddPenalty {
                side: req.side,
                category: req.category,
                delta: req.delta,
            },
            ClientMessage::SetMarker(req) => Command::SetMarker { side: req.side },
            ClientMessage::SetRules(req) => Command::SetRules(RulesUpdate {
                point_gap: req.point_gap.map(floor_threshold),
                target_score: req.target_score.map(|target| target.map(floor_threshold)),
                penalty_limit: req.penalty_limit.map(floor_threshold),
            }),
            ClientMessage::SetPenaltyVisibility(req) => Command::SetPenaltyVisibility {
                category: req.category,
                visible: req.visible,
            },
            ClientMessage::SaveConfig(req) => {
                let visibility = req.penalty_visibility.unwrap_or_default();
                Command::SaveConfig(ConfigUpdate {
                    duration_ms: floor_ms(req.duration_ms),
                    point_gap: req.point_gap.map(floor_threshold),
                    target_score: req.target_score.map(floor_threshold),
                    penalty_limit: req.penalty_limit.map(floor_threshold),
                    penalty_visibility: PenaltyVisibility {
                        c1: visibility.c1.unwrap_or(true),
                        c2: visibility.c2.unwrap_or(true),
                    },
                    pin: req.pin,
                })
            }
        };
        Some(command)
    }
}

impl Validate for ClientMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            ClientMessage::SetTimer(req) => req.validate(),
            ClientMessage::AddTime(req) => req.validate(),
            ClientMessage::AddPenalty(req) => req.validate(),
            ClientMessage::SetRules(req) => req.validate(),
            ClientMessage::SaveConfig(req) => req.validate(),
            _ => Ok(()),
        }
    }
}

/// `auth:login` payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Requested role.
    pub role: Role,
    /// Controller PIN; ignored for observers.
    #[serde(default)]
    pub pin: Option<String>,
}

/// `timer:set` payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetTimerRequest {
    /// New duration in milliseconds; missing or negative counts as zero.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub initial_ms: f64,
}

/// `timer:add` payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddTimeRequest {
    /// Milliseconds to add; missing or negative adds nothing.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub ms: Option<f64>,
}

/// `score:add` payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddScoreRequest {
    /// Side to adjust.
    pub side: Side,
    /// Signed correction, usually -1, +1, +2 or +3.
    pub delta: i32,
}

/// `penalty:add` payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AddPenaltyRequest {
    /// Side to adjust.
    pub side: Side,
    /// Counter to adjust.
    #[serde(alias = "cat")]
    pub category: PenaltyCategory,
    /// -1 or +1.
    #[validate(custom(function = "validate_penalty_delta"))]
    pub delta: i32,
}

/// `marker:set` payload; `null` clears the marker.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetMarkerRequest {
    /// New marker side.
    #[serde(default)]
    pub side: Option<Side>,
}

/// `rules:set` payload. Absent fields are left untouched.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetRulesRequest {
    /// New point gap.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub point_gap: Option<f64>,
    /// Explicit `null` disables the target score.
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<f64>)]
    pub target_score: Option<Option<f64>>,
    /// New penalty limit.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub penalty_limit: Option<f64>,
}

/// `penaltyVisibility:set` payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPenaltyVisibilityRequest {
    /// Category to toggle.
    #[serde(alias = "cat")]
    pub category: PenaltyCategory,
    /// New flag.
    pub visible: bool,
}

/// Partial display flags; missing categories default to visible.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PenaltyVisibilityInput {
    /// Minor penalties flag.
    #[serde(rename = "C1", default)]
    pub c1: Option<bool>,
    /// Major penalties flag.
    #[serde(rename = "C2", default)]
    pub c2: Option<bool>,
}

/// `config:save` payload.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    /// Match duration; missing means zero.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub duration_ms: f64,
    /// Point gap, current value kept when absent.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub point_gap: Option<f64>,
    /// Target score, disabled when absent or null.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub target_score: Option<f64>,
    /// Penalty limit, current value kept when absent.
    #[serde(default)]
    #[validate(custom(function = "validate_finite"))]
    pub penalty_limit: Option<f64>,
    /// Display flags.
    #[serde(default)]
    pub penalty_visibility: Option<PenaltyVisibilityInput>,
    /// New controller PIN.
    #[serde(default)]
    pub pin: Option<String>,
}

/// Messages pushed by the server, to every session or to a single one.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Complete match snapshot, sent after every commit.
    #[serde(rename = "state:full")]
    StateFull {
        /// The snapshot.
        state: MatchState,
    },
    /// The match just ended.
    #[serde(rename = "event:ended")]
    Ended {
        /// Why it ended.
        reason: EndReason,
        /// Winner, `null` on a draw.
        winner: Option<Side>,
    },
    /// The controller lock changed hands.
    #[serde(rename = "control:lock:status")]
    LockStatus {
        /// New holder, `null` when free.
        holder: Option<Uuid>,
    },
    /// Sent to the session that just claimed the lock.
    #[serde(rename = "control:lock:granted")]
    LockGranted {
        /// The claimer.
        holder: Uuid,
    },
    /// Reply to a request frame.
    #[serde(rename = "ack")]
    Ack(Ack),
}

impl ServerMessage {
    /// Event name, also used as the SSE `event:` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::StateFull { .. } => "state:full",
            ServerMessage::Ended { .. } => "event:ended",
            ServerMessage::LockStatus { .. } => "control:lock:status",
            ServerMessage::LockGranted { .. } => "control:lock:granted",
            ServerMessage::Ack(_) => "ack",
        }
    }
}

/// Wire error carried by a failed ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AckError {
    /// Stable error code, e.g. `NOT_CONTROLLER`.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

/// Reply to a request frame: `ok` plus an optional payload, or an error.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// Correlation id of the request.
    pub id: Option<u64>,
    /// Whether the request succeeded.
    pub ok: bool,
    /// New match id, returned by `timer:reset`.
    pub match_id: Option<Uuid>,
    /// Session id, returned by `auth:login`.
    pub session_id: Option<Uuid>,
    /// Granted role, returned by `auth:login`.
    pub role: Option<Role>,
    /// Whether the session holds the lock, returned by `auth:login`.
    pub controller: Option<bool>,
    /// Failure detail.
    pub error: Option<AckError>,
}

impl Ack {
    /// Bare success.
    pub fn ok() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    /// Failure with a wire code.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(AckError {
                code: code.into(),
                message: message.into(),
            }),
            ..Self::default()
        }
    }

    /// Same ack correlated to request `id`.
    pub fn with_id(self, id: Option<u64>) -> Self {
        Self { id, ..self }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: serde_json::Value) -> Result<ClientEnvelope, FrameError> {
        ClientEnvelope::from_json_str(&value.to_string())
    }

    #[test]
    fn envelope_keeps_correlation_id() {
        let envelope = decode(json!({ "type": "timer:start", "id": 42 })).unwrap();
        assert_eq!(envelope.id, Some(42));
        assert_eq!(envelope.message.into_command(), Some(Command::Start));
    }

    #[test]
    fn legacy_marker_and_side_names_are_accepted() {
        let envelope = decode(json!({ "type": "senshu:set", "side": "red" })).unwrap();
        assert_eq!(
            envelope.message.into_command(),
            Some(Command::SetMarker { side: Some(Side::Left) })
        );

        let envelope =
            decode(json!({ "type": "penalty:add", "side": "blue", "cat": "C2", "delta": 1 }))
                .unwrap();
        assert_eq!(
            envelope.message.into_command(),
            Some(Command::AddPenalty {
                side: Side::Right,
                category: PenaltyCategory::C2,
                delta: 1
            })
        );
    }

    #[test]
    fn bad_penalty_delta_fails_validation() {
        let err = decode(json!({ "type": "penalty:add", "side": "left", "cat": "C1", "delta": 2 }))
            .unwrap_err();
        assert!(matches!(err, FrameError::Invalid(_)));
    }

    #[test]
    fn score_delta_is_passed_through() {
        let envelope = decode(json!({ "type": "score:add", "side": "left", "delta": 7 })).unwrap();
        assert_eq!(
            envelope.message.into_command(),
            Some(Command::AddScore { side: Side::Left, delta: 7 })
        );
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = decode(json!({ "type": "score:steal" })).unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn timer_inputs_are_floored() {
        let envelope = decode(json!({ "type": "timer:set", "initialMs": 1500.7 })).unwrap();
        assert_eq!(
            envelope.message.into_command(),
            Some(Command::SetTimer { initial_ms: 1500 })
        );
        let envelope = decode(json!({ "type": "timer:add", "ms": -300 })).unwrap();
        assert_eq!(envelope.message.into_command(), Some(Command::AddTime { ms: 0 }));
        let envelope = decode(json!({ "type": "timer:set" })).unwrap();
        assert_eq!(envelope.message.into_command(), Some(Command::SetTimer { initial_ms: 0 }));
    }

    #[test]
    fn rules_distinguish_null_from_absent() {
        let envelope = decode(json!({ "type": "rules:set", "targetScore": null })).unwrap();
        let Some(Command::SetRules(update)) = envelope.message.into_command() else {
            panic!("expected rules command");
        };
        assert_eq!(update.target_score, Some(None));
        assert_eq!(update.point_gap, None);

        let envelope = decode(json!({ "type": "rules:set", "pointGap": 4 })).unwrap();
        let Some(Command::SetRules(update)) = envelope.message.into_command() else {
            panic!("expected rules command");
        };
        assert_eq!(update.target_score, None);
        assert_eq!(update.point_gap, Some(4));
    }

    #[test]
    fn config_save_defaults_missing_visibility_to_shown() {
        let envelope = decode(json!({
            "type": "config:save",
            "durationMs": 120000,
            "penaltyVisibility": { "C2": false },
            "pin": "1234"
        }))
        .unwrap();
        let Some(Command::SaveConfig(update)) = envelope.message.into_command() else {
            panic!("expected config command");
        };
        assert_eq!(update.duration_ms, 120_000);
        assert_eq!(update.penalty_visibility, PenaltyVisibility { c1: true, c2: false });
        assert_eq!(update.pin.as_deref(), Some("1234"));
        assert_eq!(update.target_score, None);
    }

    #[test]
    fn session_requests_carry_no_command() {
        let envelope =
            decode(json!({ "type": "auth:login", "role": "control", "pin": "0000" })).unwrap();
        assert!(matches!(
            &envelope.message,
            ClientMessage::Login(LoginRequest { role: Role::Controller, .. })
        ));
        assert_eq!(envelope.message.into_command(), None);

        let envelope = decode(json!({ "type": "hb:ping", "t": 12 })).unwrap();
        assert_eq!(envelope.message.into_command(), None);
    }

    #[test]
    fn ack_omits_empty_fields() {
        let ack = serde_json::to_value(ServerMessage::Ack(Ack::ok().with_id(Some(7)))).unwrap();
        assert_eq!(ack, json!({ "type": "ack", "id": 7, "ok": true }));

        let ack = serde_json::to_value(Ack::error("NOT_CONTROLLER", "no")).unwrap();
        assert_eq!(
            ack,
            json!({ "ok": false, "error": { "code": "NOT_CONTROLLER", "message": "no" } })
        );
    }

    #[test]
    fn broadcast_names_match_tags() {
        let message = ServerMessage::LockStatus { holder: None };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], message.event_name());
        assert!(value["holder"].is_null());
    }
}
