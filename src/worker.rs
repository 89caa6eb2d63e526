use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::aggregator::Aggregator;
use crate::betting::{BetRamp, RoundResult, WongOutTracker};
use crate::counting::{CountingSystem, DeckEstimationRounding};
use crate::deviation::DeviationTable;
use crate::hand::hand_value;
use crate::request::SimulationRequest;
use crate::round::{DealOutcome, RoundMachine, TcReading};
use crate::rules::Rules;
use crate::shoe::Shoe;

/// What one call to [`Worker::run_round`] did, so the caller's outer loop
/// knows whether to count it toward the target hand count (spec.md §4.3
/// "wonged-out rounds burn cards but are not counted").
pub enum RoundOutcome {
    WongedOut,
    Played { profit: f64, result: RoundResult },
}

/// Drives one seeded shoe through as many rounds as asked, owning every
/// piece of per-worker state (spec.md §5 "nothing is shared across
/// workers"). The single-threaded engine and each parallel chunk both wrap
/// a `Worker` and differ only in their outer loop, mirroring how the
/// original engine's `run_simulation` and `_run_chunk_worker` are near
/// duplicates of each other.
pub struct Worker {
    shoe: Shoe,
    counting: CountingSystem,
    deviations: DeviationTable,
    rules: Rules,
    bet_ramp: BetRamp,
    unit_size: f64,
    use_estimated_tc_for_bet: bool,
    use_estimated_tc_for_deviations: bool,
    deck_estimation_step: f64,
    deck_estimation_rounding: DeckEstimationRounding,
    debug_log: bool,
    debug_log_hands: usize,
    rng: StdRng,
    wong_out: WongOutTracker,
    pub aggregator: Aggregator,
    pub debug_logs: Vec<HashMap<String, String>>,
}

impl Worker {
    pub fn new(seed: u64, request: &SimulationRequest) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let shoe = Shoe::new(request.rules.decks, request.rules.penetration, &mut rng);
        Worker {
            shoe,
            counting: request.counting_system.clone(),
            deviations: DeviationTable::new(request.deviations.clone()),
            rules: request.rules,
            bet_ramp: request.bet_ramp.clone(),
            unit_size: request.unit_size,
            use_estimated_tc_for_bet: request.use_estimated_tc_for_bet,
            use_estimated_tc_for_deviations: request.use_estimated_tc_for_deviations,
            deck_estimation_step: request.deck_estimation_step,
            deck_estimation_rounding: request.deck_estimation_rounding,
            debug_log: request.debug_log,
            debug_log_hands: request.debug_log_hands,
            rng,
            wong_out: WongOutTracker::default(),
            aggregator: Aggregator::new(),
            debug_logs: Vec::new(),
        }
    }

    fn tc_reading(&self) -> TcReading {
        TcReading::from_shoe(&self.shoe, self.deck_estimation_step, self.deck_estimation_rounding)
    }

    fn wants_debug_entry(&self) -> bool {
        self.debug_log && self.debug_logs.len() < self.debug_log_hands
    }

    /// Plays exactly one round attempt: either a wonged-out burn (no round
    /// counted, two cards drawn to advance the shoe realistically) or a
    /// full round through the `RoundMachine` (spec.md §4.4).
    pub fn run_round(&mut self) -> RoundOutcome {
        let reading = self.tc_reading();
        let tc_for_bet = if self.use_estimated_tc_for_bet {
            reading.estimated
        } else {
            reading.raw
        };
        let tc_for_dev = if self.use_estimated_tc_for_deviations {
            reading.estimated
        } else {
            reading.raw
        };

        let raw_floor = reading.raw.floor() as i32;
        let est_floor = reading.estimated.floor() as i32;
        let bet_bucket = tc_for_bet.floor() as i32;
        self.aggregator.observe_tc(raw_floor, est_floor, bet_bucket);

        if self.wong_out.should_skip(bet_bucket, &self.bet_ramp) {
            self.aggregator.record_wong_out(bet_bucket);
            self.shoe.draw(&self.counting, &mut self.rng);
            self.shoe.draw(&self.counting, &mut self.rng);
            return RoundOutcome::WongedOut;
        }

        let bet = self.bet_ramp.choose_bet(tc_for_bet, self.unit_size);
        self.aggregator.record_initial_bet(bet);

        let mut machine = RoundMachine::new(bet);
        let deal_outcome = machine
            .deal_and_check_naturals(
                &mut self.shoe,
                &self.counting,
                &mut self.rng,
                &self.deviations,
                tc_for_dev,
                &self.rules,
            )
            .expect("deal_and_check_naturals is always called while Dealing");

        let (round_profit, result) = match deal_outcome {
            DealOutcome::Natural { profit } => {
                if self.wants_debug_entry() {
                    let entry = self.natural_debug_entry(&machine, &reading, bet, profit);
                    self.debug_logs.push(entry);
                }
                (profit, classify(profit))
            }
            DealOutcome::Continue { insurance_payout } => {
                let deviations = &self.deviations;
                let rules = self.rules;
                let step = self.deck_estimation_step;
                let rounding = self.deck_estimation_rounding;
                let use_est = self.use_estimated_tc_for_deviations;
                let finished = machine
                    .play_hands(
                        &mut self.shoe,
                        &self.counting,
                        &mut self.rng,
                        deviations,
                        &rules,
                        |shoe| {
                            let r = TcReading::from_shoe(shoe, step, rounding);
                            if use_est {
                                r.estimated
                            } else {
                                r.raw
                            }
                        },
                    )
                    .expect("play_hands is always called while Playing");
                let dealer_total = machine
                    .play_dealer(&mut self.shoe, &self.counting, &mut self.rng, &self.rules)
                    .expect("play_dealer is always called while DealerTurn");

                let (round_profit, result, hand_profits) = machine
                    .resolve(&finished, dealer_total, insurance_payout)
                    .expect("resolve is always called while Resolving");

                if self.wants_debug_entry() {
                    for (fh, &profit) in finished.iter().zip(hand_profits.iter()) {
                        if !self.wants_debug_entry() {
                            break;
                        }
                        let entry = self.hand_debug_entry(&reading, &machine, dealer_total, fh, profit);
                        self.debug_logs.push(entry);
                    }
                }

                (round_profit, result)
            }
        };

        self.aggregator.record_round(bet_bucket, round_profit, bet);
        self.wong_out.record_round(result);
        RoundOutcome::Played {
            profit: round_profit,
            result,
        }
    }

    fn natural_debug_entry(
        &self,
        machine: &RoundMachine,
        reading: &TcReading,
        bet: f64,
        profit: f64,
    ) -> HashMap<String, String> {
        let mut entry = HashMap::new();
        entry.insert("hand".to_string(), (self.aggregator.rounds_played() + 1).to_string());
        entry.insert("type".to_string(), "blackjack_resolve".to_string());
        entry.insert("player".to_string(), cards_to_string(machine.player()));
        entry.insert("dealer".to_string(), cards_to_string(machine.dealer()));
        entry.insert("true_count".to_string(), format!("{:.2}", reading.raw));
        entry.insert("true_count_est".to_string(), format!("{:.2}", reading.estimated));
        entry.insert("bet".to_string(), format!("{:.2}", bet));
        entry.insert("profit".to_string(), format!("{:.2}", profit));
        entry
    }

    fn hand_debug_entry(
        &self,
        reading: &TcReading,
        machine: &RoundMachine,
        dealer_total: u8,
        fh: &crate::hand::FinishedHand,
        profit: f64,
    ) -> HashMap<String, String> {
        let (player_total, _) = hand_value(&fh.cards);
        let mut entry = HashMap::new();
        entry.insert("hand".to_string(), (self.aggregator.rounds_played() + 1).to_string());
        entry.insert("player".to_string(), cards_to_string(&fh.cards));
        entry.insert("dealer".to_string(), cards_to_string(machine.dealer()));
        entry.insert("true_count".to_string(), format!("{:.2}", reading.raw));
        entry.insert("true_count_est".to_string(), format!("{:.2}", reading.estimated));
        entry.insert("bet".to_string(), format!("{:.2}", fh.bet));
        entry.insert("surrendered".to_string(), fh.surrendered.to_string());
        entry.insert("doubled".to_string(), fh.doubled.to_string());
        entry.insert("player_total".to_string(), player_total.to_string());
        entry.insert("dealer_total".to_string(), dealer_total.to_string());
        entry.insert("profit".to_string(), format!("{:.2}", profit));
        entry
    }
}

fn classify(profit: f64) -> RoundResult {
    if profit > 0.0 {
        RoundResult::Win
    } else if profit < 0.0 {
        RoundResult::Loss
    } else {
        RoundResult::Push
    }
}

fn cards_to_string(cards: &[crate::rank::Rank]) -> String {
    cards.iter().map(|r| r.symbol()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_plays_rounds_and_accumulates_stats() {
        let request = SimulationRequest {
            hands: 200,
            ..SimulationRequest::default()
        };
        let mut worker = Worker::new(1, &request);
        let mut played = 0;
        for _ in 0..500 {
            if played >= 200 {
                break;
            }
            if let RoundOutcome::Played { .. } = worker.run_round() {
                played += 1;
            }
        }
        assert_eq!(played, 200);
        assert_eq!(worker.aggregator.rounds_played(), 200);
    }

    #[test]
    fn debug_log_is_capped_at_debug_log_hands() {
        let request = SimulationRequest {
            hands: 200,
            debug_log: true,
            debug_log_hands: 5,
            ..SimulationRequest::default()
        };
        let mut worker = Worker::new(2, &request);
        let mut played = 0;
        while played < 100 {
            if let RoundOutcome::Played { .. } = worker.run_round() {
                played += 1;
            }
        }
        assert!(worker.debug_logs.len() <= 5);
    }
}
