use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};

use crate::rank::{Rank, RANK_ORDER};

/// A card-counting system: rank → running-count tag, plus the divisor
/// identifier seam named in spec.md §3 (only "remaining_decks" exists today).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingSystem {
    pub name: String,
    pub tags: HashMap<Rank, i32>,
    pub true_count_divisor: String,
}

impl Default for CountingSystem {
    /// Hi-Lo: 2-6 tag +1, 7-9 tag 0, T/J/Q/K/A tag -1.
    fn default() -> Self {
        let mut tags = HashMap::new();
        for rank in RANK_ORDER {
            let tag = match rank {
                Rank::Two | Rank::Three | Rank::Four | Rank::Five | Rank::Six => 1,
                Rank::Seven | Rank::Eight | Rank::Nine => 0,
                Rank::Ten | Rank::Jack | Rank::Queen | Rank::King | Rank::Ace => -1,
            };
            tags.insert(rank, tag);
        }
        CountingSystem {
            name: "Hi-Lo".to_string(),
            tags,
            true_count_divisor: "remaining_decks".to_string(),
        }
    }
}

impl CountingSystem {
    pub fn tag(&self, rank: Rank) -> i32 {
        self.tags.get(&rank).copied().unwrap_or(0)
    }
}

/// Rounding mode for the quantized true-count estimator (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
pub enum DeckEstimationRounding {
    Nearest,
    Floor,
    Ceil,
}

/// Quantizes `remaining_cards / 52` to the `step` grid, floored at one step.
/// `step <= 0` means "perfect count": the raw divisor with the 0.25 floor.
pub fn estimate_decks(remaining_cards: u32, step: f64, rounding: DeckEstimationRounding) -> f64 {
    let decks = remaining_cards as f64 / 52.0;
    if step <= 0.0 {
        return decks.max(0.25);
    }
    let val = decks / step;
    let est = match rounding {
        DeckEstimationRounding::Floor => val.floor() * step,
        DeckEstimationRounding::Ceil => val.ceil() * step,
        DeckEstimationRounding::Nearest => val.round() * step,
    };
    est.max(step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hi_lo_defaults_match_spec() {
        let sys = CountingSystem::default();
        assert_eq!(sys.tag(Rank::Two), 1);
        assert_eq!(sys.tag(Rank::Nine), 0);
        assert_eq!(sys.tag(Rank::Ace), -1);
        assert_eq!(sys.tag(Rank::King), -1);
    }

    #[test]
    fn estimate_decks_matches_seed_scenarios() {
        assert_eq!(
            estimate_decks(60, 1.0, DeckEstimationRounding::Ceil),
            2.0
        );
        assert_eq!(
            estimate_decks(60, 0.5, DeckEstimationRounding::Nearest),
            1.0
        );
        assert_eq!(
            estimate_decks(60, 0.0, DeckEstimationRounding::Floor),
            60.0 / 52.0
        );
    }

    #[test]
    fn step_floor_never_drops_below_one_step() {
        assert_eq!(estimate_decks(1, 1.0, DeckEstimationRounding::Floor), 1.0);
    }
}
