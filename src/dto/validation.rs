//! Validation helpers for inbound WebSocket payloads.

use validator::ValidationError;

use crate::state::commands::PENALTY_DELTAS;

/// Validates that a penalty correction is `-1` or `+1`.
///
/// # Examples
///
/// ```ignore
/// validate_penalty_delta(1)  // Ok
/// validate_penalty_delta(0)  // Err
/// validate_penalty_delta(-2) // Err
/// ```
pub fn validate_penalty_delta(delta: i32) -> Result<(), ValidationError> {
    if PENALTY_DELTAS.contains(&delta) {
        return Ok(());
    }
    let mut err = ValidationError::new("penalty_delta");
    err.message =
        Some(format!("penalty delta must be one of {PENALTY_DELTAS:?} (got {delta})").into());
    Err(err)
}

/// Rejects NaN and infinities in numeric payloads.
pub fn validate_finite(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("finite");
        err.message = Some("number must be finite".into());
        Err(err)
    }
}

/// Floor a millisecond amount, treating negatives as zero.
pub fn floor_ms(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.floor() as u64
    } else {
        0
    }
}

/// Floor a rule threshold before clamping.
pub fn floor_threshold(value: f64) -> i64 {
    value.floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_penalty_delta() {
        assert!(validate_penalty_delta(1).is_ok());
        assert!(validate_penalty_delta(-1).is_ok());
        assert!(validate_penalty_delta(0).is_err());
        assert!(validate_penalty_delta(2).is_err());
    }

    #[test]
    fn test_floor_ms() {
        assert_eq!(floor_ms(1500.9), 1500);
        assert_eq!(floor_ms(-20.0), 0);
        assert_eq!(floor_ms(f64::NAN), 0);
    }

    #[test]
    fn test_validate_finite() {
        assert!(validate_finite(1.0).is_ok());
        assert!(validate_finite(f64::INFINITY).is_err());
        assert!(validate_finite(f64::NAN).is_err());
    }
}
