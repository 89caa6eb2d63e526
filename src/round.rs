use blackjack_macros::allowed_phase;

use crate::betting::RoundResult;
use crate::counting::{CountingSystem, DeckEstimationRounding};
use crate::deviation::DeviationTable;
use crate::hand::{hand_value, is_blackjack, FinishedHand, HandState};
use crate::policy::{self, pair_strategy_action, Action, PairAction};
use crate::rank::{Rank, UpcardKey};
use crate::rules::Rules;
use crate::shoe::Shoe;

use rand::RngCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GamePhase {
    Dealing,
    Playing,
    DealerTurn,
    Resolving,
    Done,
}

/// Everything a worker's draw/play loop needs to resolve one true-count
/// reading and one round. Owns no long-lived shoe/counter state itself —
/// those are borrowed from the worker for the round's lifetime
/// (spec.md §4.4, §9 "Shared mutable closures").
pub struct TcReading {
    pub raw: f64,
    pub estimated: f64,
}

impl TcReading {
    pub fn from_shoe(shoe: &Shoe, step: f64, rounding: DeckEstimationRounding) -> Self {
        TcReading {
            raw: shoe.true_count_raw(),
            estimated: shoe.true_count_estimated(step, rounding),
        }
    }
}

/// The per-round state machine (spec.md §4.4). One instance is built fresh
/// per round and driven phase-by-phase by the engine's round loop; the
/// `allowed_phase` guard (from `blackjack_macros`) rejects any call out of
/// its expected order.
pub struct RoundMachine {
    current_game_phase: GamePhase,
    player: Vec<Rank>,
    dealer: Vec<Rank>,
    dealer_upcard_key: UpcardKey,
    bet: f64,
}

/// Outcome of dealing and checking for naturals.
pub enum DealOutcome {
    /// Player and/or dealer had blackjack; `profit` is already final
    /// (insurance included) and no further play/dealer/resolve steps run.
    Natural { profit: f64 },
    /// No natural; the split-aware play loop should run next. Carries the
    /// insurance payout already resolved here so `resolve` can add it to
    /// every finished hand.
    Continue { insurance_payout: f64 },
}

impl RoundMachine {
    pub fn player(&self) -> &[Rank] {
        &self.player
    }

    pub fn dealer(&self) -> &[Rank] {
        &self.dealer
    }

    pub fn new(bet: f64) -> Self {
        RoundMachine {
            current_game_phase: GamePhase::Dealing,
            player: Vec::with_capacity(2),
            dealer: Vec::with_capacity(2),
            dealer_upcard_key: UpcardKey::Two,
            bet,
        }
    }

    /// Deals the initial four cards, resolves insurance, and checks for
    /// naturals (spec.md §4.4 steps 1-3).
    #[allowed_phase(Dealing)]
    pub fn deal_and_check_naturals(
        &mut self,
        shoe: &mut Shoe,
        counting: &CountingSystem,
        rng: &mut impl RngCore,
        deviations: &DeviationTable,
        tc_for_dev: f64,
        rules: &Rules,
    ) -> Result<DealOutcome, String> {
        self.player = vec![shoe.draw(counting, rng), shoe.draw(counting, rng)];
        self.dealer = vec![shoe.draw(counting, rng), shoe.draw(counting, rng)];
        self.dealer_upcard_key = self.dealer[0].upcard_key();

        let mut insurance_payout = 0.0;
        if self.dealer[0].is_ace() && policy::wants_insurance(tc_for_dev, deviations) {
            let insurance_bet = self.bet / 2.0;
            insurance_payout = if is_blackjack(&self.dealer) {
                insurance_bet * 2.0
            } else {
                -insurance_bet
            };
        }

        let dealer_bj = is_blackjack(&self.dealer);
        let player_bj = is_blackjack(&self.player);
        if dealer_bj || player_bj {
            let mut profit = insurance_payout;
            if player_bj && !dealer_bj {
                profit += self.bet * rules.blackjack_payout;
            } else if !(dealer_bj && player_bj) {
                profit -= self.bet;
            }
            self.current_game_phase = GamePhase::Done;
            return Ok(DealOutcome::Natural { profit });
        }

        self.current_game_phase = GamePhase::Playing;
        Ok(DealOutcome::Continue { insurance_payout })
    }

    /// Runs the split-aware FIFO player queue to completion (spec.md §4.4
    /// step 4). Returns the finished hands plus the insurance payout already
    /// resolved in the deal phase, carried through for the resolve step.
    #[allowed_phase(Playing)]
    pub fn play_hands(
        &mut self,
        shoe: &mut Shoe,
        counting: &CountingSystem,
        rng: &mut impl RngCore,
        deviations: &DeviationTable,
        rules: &Rules,
        request_tc: impl Fn(&Shoe) -> f64,
    ) -> Result<Vec<FinishedHand>, String> {
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(HandState::new(
            self.player.clone(),
            self.bet,
            rules.double_any_two,
        ));
        let mut finished = Vec::new();

        while let Some(mut hand) = queue.pop_front() {
            loop {
                let can_split = hand.is_pair()
                    && hand.split_depth < rules.max_splits
                    && (!hand.cards[0].is_ace() || rules.resplit_aces || hand.split_depth == 0);

                if can_split {
                    let pair_action = pair_strategy_action(hand.cards[0], self.dealer_upcard_key, rules);
                    if pair_action == PairAction::Split {
                        let can_double_after = rules.double_any_two && rules.double_after_split;
                        let left_rank = hand.cards[0];
                        let right_rank = hand.cards[1];
                        let left_card = shoe.draw(counting, rng);
                        let right_card = shoe.draw(counting, rng);
                        let mut left = HandState::new(vec![left_rank, left_card], hand.bet, can_double_after);
                        left.split_depth = hand.split_depth + 1;
                        left.is_split_aces = left_rank.is_ace();
                        let mut right = HandState::new(vec![right_rank, right_card], hand.bet, can_double_after);
                        right.split_depth = hand.split_depth + 1;
                        right.is_split_aces = right_rank.is_ace();
                        queue.push_front(right);
                        queue.push_front(left);
                        break;
                    }
                }

                let tc_for_dev = request_tc(shoe);
                let action = policy::choose_action(
                    &hand.cards,
                    self.dealer_upcard_key,
                    tc_for_dev,
                    deviations,
                    rules,
                    hand.can_double,
                );

                match action {
                    Action::Surrender if rules.surrender => {
                        finished.push(FinishedHand::from_hand(&hand, true, false));
                        break;
                    }
                    Action::Stand | Action::Surrender => {
                        finished.push(FinishedHand::from_hand(&hand, false, false));
                        break;
                    }
                    Action::Double if hand.can_double => {
                        hand.bet *= 2.0;
                        hand.cards.push(shoe.draw(counting, rng));
                        finished.push(FinishedHand::from_hand(&hand, false, true));
                        break;
                    }
                    Action::Double | Action::Hit => {
                        if hand.is_split_aces && !rules.hit_split_aces {
                            finished.push(FinishedHand::from_hand(&hand, false, false));
                            break;
                        }
                        hand.cards.push(shoe.draw(counting, rng));
                        let (total, _) = hand_value(&hand.cards);
                        if total >= 21 {
                            finished.push(FinishedHand::from_hand(&hand, false, false));
                            break;
                        }
                    }
                }
            }
        }

        self.current_game_phase = GamePhase::DealerTurn;
        Ok(finished)
    }

    /// Draws for the dealer until the hand stands (spec.md §4.4 step 5).
    #[allowed_phase(DealerTurn)]
    pub fn play_dealer(
        &mut self,
        shoe: &mut Shoe,
        counting: &CountingSystem,
        rng: &mut impl RngCore,
        rules: &Rules,
    ) -> Result<u8, String> {
        let (mut total, mut soft) = hand_value(&self.dealer);
        while total < 17 || (total == 17 && soft && rules.hit_soft_17) {
            self.dealer.push(shoe.draw(counting, rng));
            (total, soft) = hand_value(&self.dealer);
        }
        self.current_game_phase = GamePhase::Resolving;
        Ok(total)
    }

    /// Resolves every finished hand against the dealer's final total
    /// (spec.md §4.4 step 6). Insurance payout is added per finished hand,
    /// matching the original engine's behavior across split hands
    /// (spec.md §9 open question 1). Returns the total round profit, the
    /// round's win/loss/push classification, and each hand's own profit
    /// (insurance included) in `finished` order, so callers can log the
    /// real per-hand figure instead of recomputing it.
    #[allowed_phase(Resolving)]
    pub fn resolve(
        &mut self,
        finished: &[FinishedHand],
        dealer_total: u8,
        insurance_payout: f64,
    ) -> Result<(f64, RoundResult, Vec<f64>), String> {
        let mut round_profit = 0.0;
        let mut hand_profits = Vec::with_capacity(finished.len());
        for fh in finished {
            let profit = if fh.surrendered {
                -0.5 * fh.bet + insurance_payout
            } else if fh.bust {
                -fh.bet + insurance_payout
            } else {
                let (player_total, _) = hand_value(&fh.cards);
                if dealer_total > 21 || player_total > dealer_total {
                    fh.bet + insurance_payout
                } else if player_total < dealer_total {
                    -fh.bet + insurance_payout
                } else {
                    insurance_payout
                }
            };
            round_profit += profit;
            hand_profits.push(profit);
        }
        self.current_game_phase = GamePhase::Done;
        let result = if round_profit > 0.0 {
            RoundResult::Win
        } else if round_profit < 0.0 {
            RoundResult::Loss
        } else {
            RoundResult::Push
        };
        Ok((round_profit, result, hand_profits))
    }
}
