use crate::deviation::{hand_key, DeviationActionCode, DeviationTable, INSURANCE_KEY};
use crate::hand::hand_value;
use crate::rank::{Rank, UpcardKey};
use crate::rank::UpcardKey::*;
use crate::rules::Rules;

/// The resolved action a hand actually takes (spec.md §9 "Dynamic dispatch
/// of action codes" — DH/DS are resolved against `can_double` before this
/// point, not carried as their own variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Hit,
    Stand,
    Double,
    Surrender,
}

/// Basic strategy's raw verdict, before the double-or-fallback decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasicAction {
    Hit,
    Stand,
    Surrender,
    DoubleElseHit,
    DoubleElseStand,
}

/// Basic-strategy outcome for a first-card pair. Only `Split` drives the
/// round machine; the rest exist so the table can be unit tested in full
/// per spec.md §8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairAction {
    Split,
    Stand,
    Hit,
    Double,
}

fn up_in(up: UpcardKey, members: &[UpcardKey]) -> bool {
    members.contains(&up)
}

/// Pair-splitting table (spec.md §4.2). Only consulted on an untouched
/// two-card pair; split eligibility (depth, resplit-aces) is the caller's
/// concern.
pub fn pair_strategy_action(rank: Rank, upcard: UpcardKey, rules: &Rules) -> PairAction {
    match rank {
        Rank::Ace => PairAction::Split,
        Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => PairAction::Stand,
        Rank::Nine => {
            if up_in(upcard, &[Two, Three, Four, Five, Six, Eight, Nine]) {
                PairAction::Split
            } else {
                PairAction::Stand
            }
        }
        Rank::Eight => PairAction::Split,
        Rank::Seven => {
            if up_in(upcard, &[Two, Three, Four, Five, Six, Seven]) {
                PairAction::Split
            } else {
                PairAction::Hit
            }
        }
        Rank::Six => {
            let range: &[UpcardKey] = if rules.double_after_split {
                &[Two, Three, Four, Five, Six]
            } else {
                &[Three, Four, Five, Six]
            };
            if up_in(upcard, range) {
                PairAction::Split
            } else {
                PairAction::Hit
            }
        }
        Rank::Five => {
            if up_in(upcard, &[Two, Three, Four, Five, Six, Seven, Eight, Nine]) {
                PairAction::Double
            } else {
                PairAction::Hit
            }
        }
        Rank::Four => {
            if rules.double_after_split && up_in(upcard, &[Five, Six]) {
                PairAction::Split
            } else {
                PairAction::Hit
            }
        }
        Rank::Two | Rank::Three => {
            let range: &[UpcardKey] = if rules.double_after_split {
                &[Two, Three, Four, Five, Six, Seven]
            } else {
                &[Four, Five, Six, Seven]
            };
            if up_in(upcard, range) {
                PairAction::Split
            } else {
                PairAction::Hit
            }
        }
    }
}

/// Hard/soft total basic strategy (spec.md §4.2). Late surrender is checked
/// first when enabled.
fn basic_strategy_action(cards: &[Rank], upcard: UpcardKey, rules: &Rules) -> BasicAction {
    let (total, soft) = hand_value(cards);

    if rules.surrender {
        if total == 16 && up_in(upcard, &[Nine, Ten, Ace]) {
            return BasicAction::Surrender;
        }
        if total == 15 && upcard == Ten {
            return BasicAction::Surrender;
        }
    }

    if !soft {
        if total >= 17 {
            return BasicAction::Stand;
        }
        if (13..=16).contains(&total) {
            return if up_in(upcard, &[Two, Three, Four, Five, Six]) {
                BasicAction::Stand
            } else {
                BasicAction::Hit
            };
        }
        if total == 12 {
            return if up_in(upcard, &[Four, Five, Six]) {
                BasicAction::Stand
            } else {
                BasicAction::Hit
            };
        }
        if total == 11 {
            return if upcard == Ace && !rules.hit_soft_17 {
                BasicAction::Hit
            } else {
                BasicAction::DoubleElseHit
            };
        }
        if total == 10 {
            return if up_in(upcard, &[Ten, Ace]) {
                BasicAction::Hit
            } else {
                BasicAction::DoubleElseHit
            };
        }
        if total == 9 {
            if upcard == Two && rules.hit_soft_17 {
                return BasicAction::DoubleElseHit;
            }
            return if up_in(upcard, &[Three, Four, Five, Six]) {
                BasicAction::DoubleElseHit
            } else {
                BasicAction::Hit
            };
        }
        return BasicAction::Hit;
    }

    // Soft totals
    if total >= 19 {
        return BasicAction::Stand;
    }
    if total == 18 {
        if upcard == Two {
            return if rules.hit_soft_17 {
                BasicAction::DoubleElseStand
            } else {
                BasicAction::Stand
            };
        }
        if up_in(upcard, &[Three, Four, Five, Six]) {
            return BasicAction::DoubleElseStand;
        }
        if up_in(upcard, &[Seven, Eight]) {
            return BasicAction::Stand;
        }
        return BasicAction::Hit;
    }
    if total == 17 {
        return if up_in(upcard, &[Three, Four, Five, Six]) {
            BasicAction::DoubleElseHit
        } else {
            BasicAction::Hit
        };
    }
    if total == 15 || total == 16 {
        return if up_in(upcard, &[Four, Five, Six]) {
            BasicAction::DoubleElseHit
        } else {
            BasicAction::Hit
        };
    }
    if total == 13 || total == 14 {
        return if up_in(upcard, &[Five, Six]) {
            BasicAction::DoubleElseHit
        } else {
            BasicAction::Hit
        };
    }
    BasicAction::Hit
}

fn resolve_basic(action: BasicAction, can_double: bool) -> Action {
    match action {
        BasicAction::Hit => Action::Hit,
        BasicAction::Stand => Action::Stand,
        BasicAction::Surrender => Action::Surrender,
        BasicAction::DoubleElseHit => {
            if can_double {
                Action::Double
            } else {
                Action::Hit
            }
        }
        BasicAction::DoubleElseStand => {
            if can_double {
                Action::Double
            } else {
                Action::Stand
            }
        }
    }
}

/// Full per-decision resolution: deviation first, basic strategy as fallback
/// (spec.md §4.2 "three layers queried in a fixed order").
///
/// A deviation entry carrying `Split` or `Insurance` is not meaningful at a
/// live non-pair decision point; it falls through to `Hit`, matching the
/// original engine's unconditional `else: hit` branch.
pub fn choose_action(
    cards: &[Rank],
    upcard: UpcardKey,
    true_count: f64,
    deviations: &DeviationTable,
    rules: &Rules,
    can_double: bool,
) -> Action {
    let key = hand_key(cards, upcard);
    if let Some(dev_action) = deviations.apply(&key, true_count) {
        return match dev_action {
            DeviationActionCode::Stand => Action::Stand,
            DeviationActionCode::Hit => Action::Hit,
            DeviationActionCode::Surrender => Action::Surrender,
            DeviationActionCode::Double => {
                if can_double {
                    Action::Double
                } else {
                    Action::Hit
                }
            }
            DeviationActionCode::Split | DeviationActionCode::Insurance => Action::Hit,
        };
    }
    resolve_basic(basic_strategy_action(cards, upcard, rules), can_double)
}

/// Insurance decision: consult the `"insurance"` sentinel deviation key.
pub fn wants_insurance(true_count: f64, deviations: &DeviationTable) -> bool {
    deviations.apply(INSURANCE_KEY, true_count) == Some(DeviationActionCode::Insurance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deviation::Deviation;

    fn rules_h17() -> Rules {
        Rules {
            hit_soft_17: true,
            ..Rules::default()
        }
    }

    fn rules_s17() -> Rules {
        Rules {
            hit_soft_17: false,
            ..Rules::default()
        }
    }

    #[test]
    fn pair_strategy_seed_scenarios() {
        assert_eq!(
            pair_strategy_action(Rank::Eight, Ten, &rules_h17()),
            PairAction::Split
        );
        assert_eq!(
            pair_strategy_action(Rank::Ten, Six, &rules_h17()),
            PairAction::Stand
        );
        assert_eq!(
            pair_strategy_action(Rank::Nine, Seven, &rules_h17()),
            PairAction::Split
        );
    }

    #[test]
    fn basic_strategy_seed_scenarios() {
        let hand = [Rank::Ace, Rank::Seven];
        assert_eq!(
            resolve_basic(basic_strategy_action(&hand, Two, &rules_h17()), true),
            Action::Double
        );
        assert_eq!(
            resolve_basic(basic_strategy_action(&hand, Two, &rules_s17()), true),
            Action::Stand
        );

        let hand2 = [Rank::Five, Rank::Six];
        assert_eq!(
            resolve_basic(basic_strategy_action(&hand2, Ace, &rules_h17()), true),
            Action::Double
        );
        assert_eq!(
            resolve_basic(basic_strategy_action(&hand2, Ace, &rules_s17()), true),
            Action::Hit
        );
    }

    #[test]
    fn double_without_can_double_downgrades_per_origin() {
        let hand = [Rank::Five, Rank::Six]; // 11, DoubleElseHit
        assert_eq!(
            resolve_basic(basic_strategy_action(&hand, Ace, &rules_h17()), false),
            Action::Hit
        );
        let soft18 = [Rank::Ace, Rank::Seven];
        assert_eq!(
            resolve_basic(basic_strategy_action(&soft18, Three, &rules_h17()), false),
            Action::Stand
        );
    }

    #[test]
    fn deviation_downgrades_double_without_can_double() {
        let deviations = DeviationTable::new([Deviation {
            hand_key: "10vT".to_string(),
            tc_floor: 0,
            action: DeviationActionCode::Double,
        }]);
        let hand = [Rank::Six, Rank::Four];
        assert_eq!(
            choose_action(&hand, Ten, 1.0, &deviations, &rules_h17(), false),
            Action::Hit
        );
    }
}
