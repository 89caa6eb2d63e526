use blackjack_sim::betting::{BetRamp, BetRampEntry, WongOutPolicy};
use blackjack_sim::deviation::{Deviation, DeviationActionCode};

fn dev(hand_key: &str, tc_floor: i32, action: DeviationActionCode) -> Deviation {
    Deviation {
        hand_key: hand_key.to_string(),
        tc_floor,
        action,
    }
}

/// Illustrious 18 + Fab 4, a common subset of index plays (spec.md's
/// supplemented presets, re-keyed to the canonical T-collapsed grammar —
/// the original data file spells ten-valued upcards as the literal digits
/// "10" rather than the "T" every hand_key actually resolves to at runtime).
pub fn illustrious_18_fab_4() -> Vec<Deviation> {
    use DeviationActionCode::*;
    vec![
        dev("16vT", 0, Stand),
        dev("15vT", 4, Stand),
        dev("10vT", 4, Double),
        dev("12v3", 2, Stand),
        dev("12v2", 3, Stand),
        dev("12v4", 0, Stand),
        dev("12v5", -2, Stand),
        dev("12v6", -1, Stand),
        dev("9v2", 1, Double),
        dev("9v7", 3, Double),
        dev("10vA", 4, Double),
        dev("11vA", 1, Double),
        dev("16v9", 5, Stand),
        dev("13v2", -1, Stand),
        dev("13v3", -2, Stand),
        dev("15v9", 5, Stand),
        dev("insurance", 3, Insurance),
        // Fab 4 surrender
        dev("15vT_surrender", 0, Surrender),
        dev("15v9_surrender", 2, Surrender),
        dev("15vA_surrender", 1, Surrender),
        dev("14vT_surrender", 3, Surrender),
    ]
}

/// Starter 1-12 bet spread with a Wong-out floor at true count -2
/// (spec.md's supplemented presets).
pub fn default_ramp() -> BetRamp {
    BetRamp {
        steps: vec![
            BetRampEntry { tc_floor: -1, units: 1.0 },
            BetRampEntry { tc_floor: 0, units: 2.0 },
            BetRampEntry { tc_floor: 1, units: 4.0 },
            BetRampEntry { tc_floor: 2, units: 6.0 },
            BetRampEntry { tc_floor: 3, units: 8.0 },
            BetRampEntry { tc_floor: 4, units: 10.0 },
            BetRampEntry { tc_floor: 5, units: 12.0 },
        ],
        wong_out_below: Some(-2),
        wong_out_policy: WongOutPolicy::Anytime,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illustrious_18_fab_4_has_no_stray_digit_upcards() {
        for d in illustrious_18_fab_4() {
            assert!(!d.hand_key.contains("10"), "{} still spells ten as a digit", d.hand_key);
        }
    }

    #[test]
    fn default_ramp_normalizes_without_duplicate_floors() {
        assert!(default_ramp().normalized().is_ok());
    }
}
