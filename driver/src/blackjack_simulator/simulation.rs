use std::time::Instant;

use blackjack_driver::Config;
use blackjack_sim::{engine, parallel};
use log::info;

/// Runs one simulation from a loaded [`Config`] and prints progress plus a
/// final summary to stdout (teacher's plain `println!` reporting style).
pub fn run_and_report(config: &Config) {
    let request = config
        .request
        .clone()
        .validate()
        .expect("invalid simulation request");

    let mut progress_cb = |played: u64, target: u64, sum_profit: f64, _sum_sq: f64, _sum_bet: f64| {
        let pct = 100.0 * played as f64 / target as f64;
        let running_ev = if played > 0 {
            sum_profit / played as f64 * 100.0
        } else {
            0.0
        };
        println!("  {played}/{target} hands ({pct:.1}%) - running EV/100: {running_ev:.3}");
    };

    let start = Instant::now();
    let result = if request.processes > 1 {
        info!("running parallel simulation across {} workers", config.threads);
        parallel::run(&request, config.threads.max(1), Some(&mut progress_cb), None)
    } else {
        engine::run(&request, Some(&mut progress_cb), None)
    };
    let elapsed = start.elapsed();

    println!();
    println!(
        "Finished {} hands in {:.2}s",
        result.rounds_played,
        elapsed.as_secs_f64()
    );
    println!("EV per 100 hands: {:.3}%", result.ev_per_100);
    println!("Stdev per 100 hands: {:.3}%", result.stdev_per_100);
    println!("Standard deviation index (DI): {:.3}", result.di);
    println!("N0 (hands to a 1-SD edge): {:.0}", result.n0_hands);
    if let Some(ror) = result.ror {
        println!("Risk of ruin: {:.4}%", ror * 100.0);
    }
    if let Some(avg_bet) = result.avg_initial_bet {
        println!(
            "Average initial bet: {:.2} ({:.2} units)",
            avg_bet,
            result.avg_initial_bet_units.unwrap_or(0.0)
        );
    }
    for (key, value) in &result.meta {
        println!("meta.{key}: {value}");
    }
}
