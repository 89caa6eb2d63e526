use std::collections::HashMap;

use log::info;

use crate::request::SimulationRequest;
use crate::result::{build_result, SimulationResult};
use crate::worker::{RoundOutcome, Worker};

/// `progress_cb(rounds_played, target_rounds, sum_profit, sum_sq_profit, sum_initial_bet)`,
/// matching the original engine's callback shape (spec.md §4.6). `Send`/`Sync`
/// so the parallel driver can share the same callback types across chunk
/// threads (spec.md §5).
pub type ProgressCallback<'a> = dyn FnMut(u64, u64, f64, f64, f64) + Send + 'a;
pub type CancelCheck<'a> = dyn Fn() -> bool + Sync + 'a;

/// Single-threaded simulation loop (spec.md §4.6). Owns one [`Worker`] and
/// drives it round by round, checking cancellation and reporting progress
/// at the same cadence as the original engine's `run_simulation`.
pub fn run(
    request: &SimulationRequest,
    mut progress_cb: Option<&mut ProgressCallback>,
    cancel_check: Option<&CancelCheck>,
) -> SimulationResult {
    let target_rounds = request.hands;
    let progress_interval = (target_rounds / 50).max(10_000);
    let cancel_check_interval = (target_rounds / 100).max(1_000);

    let mut worker = Worker::new(request.seed, request);
    let mut was_cancelled = false;

    while worker.aggregator.rounds_played() < target_rounds {
        if let Some(check) = cancel_check {
            if worker.aggregator.rounds_played() % cancel_check_interval == 0 && check() {
                was_cancelled = true;
                break;
            }
        }

        if let RoundOutcome::Played { .. } = worker.run_round() {
            let rounds_played = worker.aggregator.rounds_played();
            if rounds_played % progress_interval == 0 {
                if let Some(ref mut cb) = progress_cb {
                    cb(
                        rounds_played,
                        target_rounds,
                        worker.aggregator.sum_profit(),
                        worker.aggregator.sum_sq_profit(),
                        worker.aggregator.sum_initial_bet(),
                    );
                }
            }
        }
    }

    if let Some(ref mut cb) = progress_cb {
        cb(
            worker.aggregator.rounds_played(),
            target_rounds,
            worker.aggregator.sum_profit(),
            worker.aggregator.sum_sq_profit(),
            worker.aggregator.sum_initial_bet(),
        );
    }

    let mut meta = HashMap::new();
    meta.insert(
        "note".to_string(),
        if was_cancelled { "cancelled" } else { "single-process sim" }.to_string(),
    );
    meta.insert("was_cancelled".to_string(), was_cancelled.to_string());

    info!(
        "single-process sim finished: {} rounds played (cancelled={})",
        worker.aggregator.rounds_played(),
        was_cancelled
    );

    let debug_hands = if request.debug_log {
        Some(worker.debug_logs.clone())
    } else {
        None
    };

    build_result(
        worker.aggregator.rounds_played(),
        worker.aggregator.sum_profit(),
        worker.aggregator.sum_sq_profit(),
        worker.aggregator.sum_initial_bet(),
        worker.aggregator.tc_histogram().clone(),
        worker.aggregator.tc_histogram_est().clone(),
        worker.aggregator.tc_stats().clone(),
        request,
        meta,
        debug_hands,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_the_requested_number_of_hands() {
        let request = SimulationRequest {
            hands: 500,
            ..SimulationRequest::default()
        };
        let result = run(&request, None, None);
        assert_eq!(result.rounds_played, 500);
    }

    #[test]
    fn cancellation_stops_the_loop_early() {
        let request = SimulationRequest {
            hands: 100_000,
            ..SimulationRequest::default()
        };
        let cancel = || true;
        let result = run(&request, None, Some(&cancel));
        assert!(result.rounds_played < 100_000);
        assert_eq!(result.meta.get("was_cancelled").map(String::as_str), Some("true"));
    }

    #[test]
    fn progress_callback_fires_at_the_final_tally() {
        let request = SimulationRequest {
            hands: 200,
            ..SimulationRequest::default()
        };
        let mut calls = 0;
        let mut cb = |_played: u64, _target: u64, _p: f64, _sp: f64, _b: f64| {
            calls += 1;
        };
        let result = run(&request, Some(&mut cb), None);
        assert_eq!(result.rounds_played, 200);
        assert!(calls >= 1);
    }
}
