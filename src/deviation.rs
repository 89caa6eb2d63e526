use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hand::hand_value;
use crate::rank::{Rank, UpcardKey};

/// One index-play override: "play `action` once true count reaches `tc_floor`
/// for this hand" (spec.md §3 "Deviation").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deviation {
    pub hand_key: String,
    pub tc_floor: i32,
    pub action: DeviationActionCode,
}

/// The six one-letter action codes a deviation entry may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviationActionCode {
    #[serde(rename = "S")]
    Stand,
    #[serde(rename = "H")]
    Hit,
    #[serde(rename = "D")]
    Double,
    #[serde(rename = "P")]
    Split,
    #[serde(rename = "R")]
    Surrender,
    #[serde(rename = "I")]
    Insurance,
}

/// Builds the canonical `hand_key` for a non-pair decision point:
/// `{total}[s]v{upcard}`, e.g. `16vT`, `18sv6`.
pub fn hand_key(cards: &[Rank], upcard: UpcardKey) -> String {
    let (total, soft) = hand_value(cards);
    format!("{}{}v{}", total, if soft { "s" } else { "" }, upcard)
}

pub const INSURANCE_KEY: &str = "insurance";

/// Deviation entries pre-indexed by hand_key and sorted by ascending
/// tc_floor, matching the original engine's `dev_index` construction.
#[derive(Debug, Clone, Default)]
pub struct DeviationTable {
    by_key: HashMap<String, Vec<Deviation>>,
}

impl DeviationTable {
    pub fn new(deviations: impl IntoIterator<Item = Deviation>) -> Self {
        let mut by_key: HashMap<String, Vec<Deviation>> = HashMap::new();
        for dev in deviations {
            by_key.entry(dev.hand_key.clone()).or_default().push(dev);
        }
        for entries in by_key.values_mut() {
            entries.sort_by_key(|d| d.tc_floor);
        }
        DeviationTable { by_key }
    }

    /// Checks `key` then `key_surrender`, returning the last entry (in
    /// ascending tc_floor order) whose floor is at or below `floor(true_count)`.
    pub fn apply(&self, key: &str, true_count: f64) -> Option<DeviationActionCode> {
        let floor_tc = true_count.floor() as i32;
        let surrender_key = format!("{key}_surrender");
        for candidate in [key, surrender_key.as_str()] {
            if let Some(entries) = self.by_key.get(candidate) {
                let mut hit = None;
                for dev in entries {
                    if floor_tc >= dev.tc_floor {
                        hit = Some(dev.action);
                    }
                }
                if hit.is_some() {
                    return hit;
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(hand_key: &str, tc_floor: i32, action: DeviationActionCode) -> Deviation {
        Deviation {
            hand_key: hand_key.to_string(),
            tc_floor,
            action,
        }
    }

    #[test]
    fn hand_key_grammar_matches_spec_examples() {
        assert_eq!(hand_key(&[Rank::Nine, Rank::Seven], UpcardKey::Ten), "16vT");
        assert_eq!(
            hand_key(&[Rank::Ace, Rank::Eight], UpcardKey::Six),
            "19sv6"
        );
    }

    #[test]
    fn deviation_is_right_stepped() {
        let table = DeviationTable::new([
            dev("12v5", -2, DeviationActionCode::Stand),
            dev("12v5", 3, DeviationActionCode::Hit),
        ]);
        assert_eq!(
            table.apply("12v5", -1.5),
            Some(DeviationActionCode::Stand)
        );
        assert_eq!(table.apply("12v5", 3.9), Some(DeviationActionCode::Hit));
    }

    #[test]
    fn surrender_suffix_is_checked_after_the_base_key() {
        let table = DeviationTable::new([dev(
            "15v10_surrender",
            0,
            DeviationActionCode::Surrender,
        )]);
        assert_eq!(
            table.apply("15v10", 1.0),
            Some(DeviationActionCode::Surrender)
        );
    }

    #[test]
    fn no_match_returns_none() {
        let table = DeviationTable::new([]);
        assert_eq!(table.apply("16vT", 5.0), None);
    }
}
