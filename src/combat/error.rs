use thiserror::Error;

/// Why a damage or heal request was not applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombatError {
    /// Caller error: amounts must be finite and strictly positive
    #[error("invalid amount {amount}: must be a positive number")]
    InvalidAmount { amount: f32 },
    #[error("actor is dead")]
    Dead,
    #[error("actor is invincible")]
    Invincible,
    #[error("actor is already at full health")]
    HealthFull,
}

impl CombatError {
    /// Rejected state transitions are expected gameplay outcomes, not caller bugs
    pub fn is_state_rejection(&self) -> bool {
        !matches!(self, CombatError::InvalidAmount { .. })
    }
}

/// Failure reported by a damage subscriber. Isolated by the bus, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("damage observer failed: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Validates a damage or heal amount
pub fn check_amount(amount: f32) -> Result<f32, CombatError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(amount)
    } else {
        Err(CombatError::InvalidAmount { amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_amount_accepts_positive() {
        assert_eq!(check_amount(12.5), Ok(12.5));
    }

    #[test]
    fn test_check_amount_rejects_zero_negative_and_nan() {
        assert!(check_amount(0.0).is_err());
        assert!(check_amount(-3.0).is_err());
        assert!(check_amount(f32::NAN).is_err());
        assert!(check_amount(f32::INFINITY).is_err());
    }

    #[test]
    fn test_state_rejection_classification() {
        assert!(CombatError::Dead.is_state_rejection());
        assert!(CombatError::Invincible.is_state_rejection());
        assert!(CombatError::HealthFull.is_state_rejection());
        assert!(!CombatError::InvalidAmount { amount: 0.0 }.is_state_rejection());
    }

    #[test]
    fn test_observer_error_message() {
        let err = ObserverError::new("text prefab missing");
        assert_eq!(err.to_string(), "damage observer failed: text prefab missing");
    }
}
