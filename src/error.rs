use thiserror::Error;

/// Raised by [`crate::request::SimulationRequest::validate`] before the engine runs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("blackjack_payout must be greater than 1.0, got {0}")]
    BlackjackPayout(f64),
    #[error("decks must be in [1, 8], got {0}")]
    Decks(u8),
    #[error("penetration must be in [0.1, 0.99], got {0}")]
    Penetration(f64),
    #[error("max_splits must be in [0, 4], got {0}")]
    MaxSplits(u8),
    #[error("bet ramp must have at least one step")]
    EmptyRamp,
    #[error("duplicate tc_floor {0} in bet ramp")]
    DuplicateRampStep(i32),
    #[error("hands must be >= 100, got {0}")]
    Hands(u64),
    #[error("hands_per_hour must be > 0, got {0}")]
    HandsPerHour(f64),
}
