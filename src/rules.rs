use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Table rules (spec.md §3 "Rules").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub decks: u8,
    pub hit_soft_17: bool,
    pub double_after_split: bool,
    pub double_any_two: bool,
    pub surrender: bool,
    pub resplit_aces: bool,
    pub max_splits: u8,
    pub hit_split_aces: bool,
    pub blackjack_payout: f64,
    pub dealer_peeks: bool,
    pub penetration: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            decks: 6,
            hit_soft_17: true,
            double_after_split: true,
            double_any_two: true,
            surrender: true,
            resplit_aces: true,
            max_splits: 3,
            hit_split_aces: false,
            blackjack_payout: 1.5,
            dealer_peeks: true,
            penetration: 0.75,
        }
    }
}

impl Rules {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.blackjack_payout <= 1.0 {
            return Err(ValidationError::BlackjackPayout(self.blackjack_payout));
        }
        if self.decks < 1 || self.decks > 8 {
            return Err(ValidationError::Decks(self.decks));
        }
        if self.penetration < 0.1 || self.penetration > 0.99 {
            return Err(ValidationError::Penetration(self.penetration));
        }
        if self.max_splits > 4 {
            return Err(ValidationError::MaxSplits(self.max_splits));
        }
        Ok(())
    }
}
